pub mod board;
pub mod card;
pub mod column;
pub mod export;
pub mod extract;
pub mod plan;
pub mod stats;
pub mod text;

pub use board::{Board, BoardKind, BoardLayout, Connection};
pub use card::{Attachment, Card, CardPosition, Embed};
pub use column::Column;
pub use export::{BoardExport, BoardExporter, BoardImporter};
pub use extract::BoardExtractor;
pub use plan::{MigrationPlan, PlannedColumn};
pub use stats::BoardStats;
