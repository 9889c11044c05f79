pub mod monthly;
pub mod records;

pub use monthly::{aggregate_monthly, days_in_month, month_key, MonthlySummary};
pub use records::{parse_record_date, AmountError, CoercionError, Fee, MedicineRecord, VisitRecord};
