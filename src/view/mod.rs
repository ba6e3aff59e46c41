pub mod model;
pub mod selection;

pub use model::{AdminUserView, AssignmentChange, BioSummary, DashboardView, Panels, ViewModel};
pub use selection::{reconcile_selections, ClearedSelections, Selections};
