//! Projections module - Pure, side-effect-free derivations of store state
//! for each rendering surface.

mod badge;
mod chart;
mod live_status;
mod map_markers;
mod paged_list;

pub use badge::{project_badge, UnreadBadge};
pub use chart::{project_charts, ChartSeries, StatisticsCharts};
pub use live_status::{project_live_status, LiveStatus};
pub use map_markers::{project_markers, MapMarker};
pub use paged_list::{project_page, PagedListView};
