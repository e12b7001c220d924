mod business_day;
mod timing;

pub use business_day::BusinessDayCalculator;
pub use timing::{
    TODAY_LABEL, TOMORROW_LABEL, TimingError, TimingExpression, evaluate, format_days_text,
    is_same_date,
};
