use crate::model::{TableId, Ts};
use crate::source::GuestDetails;

/// The finite set of input changes the widget reacts to.
///
/// Whatever triggered a change (calendar click, stepper, floor-plan tap) is
/// the presentation layer's business; the session only sees one of these.
/// `DateChanged` and `PartySizeChanged` trigger a fresh availability query
/// through the sequencer; the rest recompute locally.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    DateChanged { date: String },
    PartySizeChanged { party_size: u32 },
    DurationChanged { steps: u32 },
    /// `None` clears the chosen start time; re-sending the current time
    /// also clears it.
    TimeChosen { timestamp: Option<Ts> },
    TableToggled { table: TableId },
    SelectionCleared,
    SubmitRequested { guest: GuestDetails },
    WidgetReset,
}
