mod avg;
mod count;
mod minmax;
mod sum;

pub use avg::AvgAgg;
pub use count::CountAgg;
pub use minmax::MinMaxAgg;
pub use sum::SumAgg;
