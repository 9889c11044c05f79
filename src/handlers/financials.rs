use axum::extract::State;
use tracing::info;

use crate::app::AppState;
use crate::financials::{aggregate_monthly, MedicineRecord, MonthlySummary, VisitRecord};
use crate::middleware::{ApiResponse, ApiResult};

const VISIT_COLUMNS: &str = "date, consultation_fee, drug_fee, Procedure_Fee, new_old, referral";
const MEDICINE_COLUMNS: &str = "date, drug_fee";

/// GET /api/financials/monthly-stats - revenue breakdown per month, newest first
pub async fn monthly_stats(State(state): State<AppState>) -> ApiResult<Vec<MonthlySummary>> {
    let (visits, medicines) = tokio::try_join!(
        state.managed.table("visits").select(VISIT_COLUMNS).fetch_as::<VisitRecord>(),
        state.managed.table("medicines").select(MEDICINE_COLUMNS).fetch_as::<MedicineRecord>(),
    )?;
    info!("Fetched {} visits and {} medicine records", visits.len(), medicines.len());

    let report = aggregate_monthly(&visits, &medicines)?;
    info!("Returning {} months of data", report.len());

    Ok(ApiResponse::success(report))
}
