mod agg_trait;
mod bucket;
mod metric;
pub mod types;

pub use agg_trait::{Agg, AggSegmentContext, PreparedAgg, SegmentAgg};
pub use bucket::TermsAgg;
pub use metric::{AvgAgg, CountAgg, MinMaxAgg, SumAgg};
pub use types::{
    AggregationRequest, AggregationResult, AggregationType, AggregationValue,
    Bucket, HistogramBounds, PercentilesResult, RangeEntry, StatsResult,
};
