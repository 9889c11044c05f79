//! Monthly revenue breakdown
//!
//! Groups visit and medicine rows by calendar month and derives per-month
//! counts, revenue and average daily revenue.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

use super::records::{parse_record_date, AmountError, MedicineRecord, VisitRecord};

/// One row of the monthly report, keyed by `YYYY-MM`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlySummary {
    pub month: String,
    pub total_visits: u64,
    pub drug_visits: u64,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_revenue: Decimal,
    pub new_patients: u64,
    pub google_referrals: u64,
    #[serde(with = "rust_decimal::serde::float")]
    pub avg_daily_revenue: Decimal,
}

#[derive(Debug)]
struct MonthTotals {
    year: i32,
    month: u32,
    total_visits: u64,
    drug_visits: u64,
    total_revenue: Decimal,
    new_patients: u64,
    google_referrals: u64,
}

impl MonthTotals {
    fn new(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
            total_visits: 0,
            drug_visits: 0,
            total_revenue: Decimal::ZERO,
            new_patients: 0,
            google_referrals: 0,
        }
    }

    fn add_revenue(&mut self, amount: Decimal) -> Result<(), AmountError> {
        self.total_revenue = self
            .total_revenue
            .checked_add(amount)
            .ok_or(AmountError::Overflow("monthly revenue"))?;
        Ok(())
    }

    fn into_summary(self, month_key: String) -> MonthlySummary {
        let days = Decimal::from(days_in_month(self.year, self.month));
        MonthlySummary {
            month: month_key,
            total_visits: self.total_visits,
            drug_visits: self.drug_visits,
            total_revenue: self.total_revenue,
            new_patients: self.new_patients,
            google_referrals: self.google_referrals,
            avg_daily_revenue: self.total_revenue / days,
        }
    }
}

/// `YYYY-MM` key of a date
pub fn month_key(date: NaiveDate) -> String {
    format!("{}-{:02}", date.year(), date.month())
}

/// Number of days in a month of the proleptic Gregorian calendar
pub fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .map(|last| last.day())
        .unwrap_or(31)
}

fn record_month(raw: Option<&str>) -> Option<NaiveDate> {
    raw.filter(|s| !s.is_empty()).and_then(parse_record_date)
}

/// Build the monthly report, newest month first.
///
/// Rows without a readable date are left out of every total. A fee that is
/// not a number, or a total past `Decimal`'s range, fails the whole report.
pub fn aggregate_monthly(
    visits: &[VisitRecord],
    medicines: &[MedicineRecord],
) -> Result<Vec<MonthlySummary>, AmountError> {
    let mut months: BTreeMap<String, MonthTotals> = BTreeMap::new();
    let mut skipped = 0usize;

    for visit in visits {
        let Some(date) = record_month(visit.date.as_deref()) else {
            skipped += 1;
            continue;
        };
        let totals = months.entry(month_key(date)).or_insert_with(|| MonthTotals::new(date));

        totals.total_visits += 1;
        totals.add_revenue(visit.revenue()?)?;
        if visit.is_new_patient() {
            totals.new_patients += 1;
        }
        if visit.is_google_referral() {
            totals.google_referrals += 1;
        }
    }

    for medicine in medicines {
        let Some(date) = record_month(medicine.date.as_deref()) else {
            skipped += 1;
            continue;
        };
        let totals = months.entry(month_key(date)).or_insert_with(|| MonthTotals::new(date));

        totals.drug_visits += 1;
        totals.add_revenue(medicine.revenue()?)?;
    }

    if skipped > 0 {
        debug!("Skipped {} rows without a usable date", skipped);
    }

    Ok(months
        .into_iter()
        .rev()
        .map(|(key, totals)| totals.into_summary(key))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::financials::records::{CoercionError, Fee};
    use serde_json::json;

    fn dec(raw: &str) -> Decimal {
        raw.parse().unwrap()
    }

    fn visit(date: &str, consultation: i64, drug: i64, procedure: i64, new_old: &str, referral: &str) -> VisitRecord {
        VisitRecord {
            date: Some(date.to_string()),
            consultation_fee: consultation.into(),
            drug_fee: drug.into(),
            procedure_fee: procedure.into(),
            new_old: Some(new_old.to_string()),
            referral: Some(referral.to_string()),
        }
    }

    fn medicine(date: &str, drug_fee: i64) -> MedicineRecord {
        MedicineRecord { date: Some(date.to_string()), drug_fee: drug_fee.into() }
    }

    #[test]
    fn test_month_key() {
        let date = NaiveDate::from_ymd_opt(2026, 2, 5).unwrap();
        assert_eq!(month_key(date), "2026-02");

        let date = NaiveDate::from_ymd_opt(2026, 12, 31).unwrap();
        assert_eq!(month_key(date), "2026-12");
    }

    #[test]
    fn test_days_in_month() {
        assert_eq!(days_in_month(2024, 1), 31);
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(2023, 2), 28);
        assert_eq!(days_in_month(1900, 2), 28);
        assert_eq!(days_in_month(2000, 2), 29);
        assert_eq!(days_in_month(2024, 4), 30);
        assert_eq!(days_in_month(2024, 12), 31);
    }

    #[test]
    fn aggregates_single_month() {
        let visits = vec![
            visit("2024-01-05", 100, 0, 0, "N", "Google Ads"),
            visit("2024-01-20", 50, 10, 0, "O", "friend"),
        ];
        let medicines = vec![medicine("2024-01-10", 25)];

        let report = aggregate_monthly(&visits, &medicines).unwrap();

        assert_eq!(
            report,
            vec![MonthlySummary {
                month: "2024-01".to_string(),
                total_visits: 2,
                drug_visits: 1,
                total_revenue: dec("185"),
                new_patients: 1,
                google_referrals: 1,
                avg_daily_revenue: dec("185") / dec("31"),
            }]
        );
    }

    #[test]
    fn later_month_comes_first() {
        let visits = vec![visit("2023-12-31", 10, 0, 0, "O", "")];
        let medicines = vec![medicine("2024-02-01T08:00:00Z", 29)];

        let report = aggregate_monthly(&visits, &medicines).unwrap();
        let keys: Vec<&str> = report.iter().map(|m| m.month.as_str()).collect();
        assert_eq!(keys, vec!["2024-02", "2023-12"]);

        // February 2024 has 29 days
        assert_eq!(report[0].avg_daily_revenue, Decimal::ONE);
        assert_eq!(report[0].total_visits, 0);
        assert_eq!(report[1].drug_visits, 0);
    }

    #[test]
    fn undated_rows_are_skipped() {
        let mut undated = visit("", 1000, 0, 0, "N", "google");
        undated.date = None;
        let visits = vec![undated, visit("", 1000, 0, 0, "N", "google"), visit("not a date", 5, 0, 0, "N", "")];
        let medicines = vec![
            MedicineRecord { date: None, drug_fee: 99.into() },
            medicine("2024-03-03", 7),
        ];

        let report = aggregate_monthly(&visits, &medicines).unwrap();
        assert_eq!(report.len(), 1);
        assert_eq!(report[0].month, "2024-03");
        assert_eq!(report[0].total_revenue, dec("7"));
        assert_eq!(report[0].new_patients, 0);
    }

    #[test]
    fn empty_input_gives_empty_report() {
        assert!(aggregate_monthly(&[], &[]).unwrap().is_empty());
    }

    #[test]
    fn revenue_sums_are_exact() {
        let visits = vec![VisitRecord {
            date: Some("2024-06-01".to_string()),
            consultation_fee: Fee::from(dec("0.1")),
            drug_fee: Fee::from(dec("0.2")),
            ..Default::default()
        }];
        let medicines = vec![MedicineRecord {
            date: Some("2024-06-02".to_string()),
            drug_fee: Fee::new(json!(0.3)),
        }];

        let report = aggregate_monthly(&visits, &medicines).unwrap();
        assert_eq!(report[0].total_revenue, dec("0.6"));
        assert_eq!(report[0].avg_daily_revenue, dec("0.02"));
    }

    #[test]
    fn malformed_fee_fails_report() {
        let visits = vec![VisitRecord {
            date: Some("2024-06-01".to_string()),
            procedure_fee: Fee::new(json!("n/a")),
            ..Default::default()
        }];

        let err = aggregate_monthly(&visits, &[]).unwrap_err();
        assert!(matches!(err, AmountError::Coercion(CoercionError { field: "Procedure_Fee", .. })));
    }

    #[test]
    fn malformed_fee_on_undated_row_is_ignored() {
        let visits = vec![VisitRecord {
            date: None,
            procedure_fee: Fee::new(json!("n/a")),
            ..Default::default()
        }];

        assert!(aggregate_monthly(&visits, &[]).unwrap().is_empty());
    }

    #[test]
    fn monthly_total_overflow_is_an_error() {
        let big = || VisitRecord {
            date: Some("2024-07-01".to_string()),
            consultation_fee: Fee::new(json!("70000000000000000000000000000")),
            ..Default::default()
        };

        let err = aggregate_monthly(&[big(), big()], &[]).unwrap_err();
        assert_eq!(err, AmountError::Overflow("monthly revenue"));

        let medicines = vec![MedicineRecord {
            date: Some("2024-07-02".to_string()),
            drug_fee: Fee::new(json!("70000000000000000000000000000")),
        }];
        let err = aggregate_monthly(&[big()], &medicines).unwrap_err();
        assert_eq!(err, AmountError::Overflow("monthly revenue"));
    }

    #[test]
    fn days_in_month_across_years() {
        assert_eq!(days_in_month(2023, 12), 31);
        assert_eq!(days_in_month(2100, 2), 28);
        assert_eq!(days_in_month(2400, 2), 29);
        assert_eq!(days_in_month(2024, 9), 30);
    }

    #[test]
    fn serializes_with_camel_case_fields() {
        let report = aggregate_monthly(&[], &[medicine("2024-04-15", 30)]).unwrap();
        let value = serde_json::to_value(&report).unwrap();

        assert_eq!(
            value,
            json!([{
                "month": "2024-04",
                "totalVisits": 0,
                "drugVisits": 1,
                "totalRevenue": 30.0,
                "newPatients": 0,
                "googleReferrals": 0,
                "avgDailyRevenue": 1.0
            }])
        );
    }
}
