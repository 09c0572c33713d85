//! 名片分析
//!
//! - [`clock`]: 可注入的时间源
//! - [`summary`]: 摘要重算与新鲜度判断
//! - [`refresher`]: 有界后台刷新池

pub mod clock;
pub mod refresher;
pub mod summary;

pub use clock::{Clock, ManualClock, SystemClock};
pub use refresher::{RefreshPoolConfig, SummaryRefresh, SummaryRefresher};
pub use summary::{SummaryAggregator, assemble_summary, is_fresh};
