pub mod cession;
pub mod common;
pub mod usage;

pub use cession::{NoticeRule, ReasonRule, RecipientCapRule, SelfCessionRule, TransferableSourceRule};
pub use common::{MandateRule, PositiveHoursRule};
pub use usage::OverageRule;
