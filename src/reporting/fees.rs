// src/reporting/fees.rs

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::{
    config::FEE_AMOUNT_LIMIT,
    error::FieldError,
    models::fee::{FeeAmounts, FeeTotals, FeeView, MonthlyFeeRecord, StudentFeeRow, StudentFeeSummary},
    reporting::natural_cmp,
};

/// The four monthly charges that add up to `amount_due`.
/// An absent component counts as zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeeComponents {
    pub base: Option<Decimal>,
    pub van: Option<Decimal>,
    pub exam: Option<Decimal>,
    pub electricity: Option<Decimal>,
}

impl FeeComponents {
    pub fn amount_due(&self) -> Decimal {
        [self.base, self.van, self.exam, self.electricity]
            .into_iter()
            .map(|c| c.unwrap_or(Decimal::ZERO))
            .sum()
    }
}

impl From<&MonthlyFeeRecord> for FeeComponents {
    fn from(r: &MonthlyFeeRecord) -> Self {
        Self {
            base: r.base_monthly_fee,
            van: r.monthly_van_fee,
            exam: r.monthly_exam_fee,
            electricity: r.monthly_electricity_fee,
        }
    }
}

impl From<&FeeAmounts> for FeeComponents {
    fn from(a: &FeeAmounts) -> Self {
        Self {
            base: a.base_monthly_fee,
            van: a.monthly_van_fee,
            exam: a.monthly_exam_fee,
            electricity: a.monthly_electricity_fee,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeeComputation {
    pub amount_due: Decimal,
    pub amount_remaining: Decimal,
    pub is_paid: bool,
}

/// Derives the stored/displayed figures of a fee record.
/// `is_paid` holds exactly when `amount_paid >= amount_due`.
pub fn compute(components: &FeeComponents, amount_paid: Decimal) -> FeeComputation {
    let amount_due = components.amount_due();
    let amount_remaining = amount_due - amount_paid;

    FeeComputation {
        amount_due,
        amount_remaining,
        is_paid: amount_remaining <= Decimal::ZERO,
    }
}

/// Checks one money value against a column of scale 2 bounded by `limit`.
/// Values with more than two decimals would be rounded by the database
/// independently of the figures derived from them, so they are refused.
pub fn money_error(field: &str, value: Decimal, limit: i64) -> Option<FieldError> {
    if value < Decimal::ZERO {
        Some(FieldError::new(field, "Amount cannot be negative."))
    } else if value.normalize().scale() > 2 {
        Some(FieldError::new(field, "Amount can have at most two decimal places."))
    } else if value >= Decimal::from(limit) {
        Some(FieldError::new(field, format!("Amount must be less than {}.", limit)))
    } else {
        None
    }
}

/// Every component and the paid amount must fit the fee columns, and so must their total.
pub fn validate_amounts(amounts: &FeeAmounts) -> Vec<FieldError> {
    let fields = [
        ("base_monthly_fee", amounts.base_monthly_fee),
        ("monthly_van_fee", amounts.monthly_van_fee),
        ("monthly_exam_fee", amounts.monthly_exam_fee),
        ("monthly_electricity_fee", amounts.monthly_electricity_fee),
        ("amount_paid", Some(amounts.amount_paid)),
    ];

    let mut errors: Vec<FieldError> = fields
        .into_iter()
        .filter_map(|(field, value)| money_error(field, value?, FEE_AMOUNT_LIMIT))
        .collect();

    if errors.is_empty() && FeeComponents::from(amounts).amount_due() >= Decimal::from(FEE_AMOUNT_LIMIT) {
        errors.push(FieldError::new(
            "amount_due",
            format!("Total of the fee components must be less than {}.", FEE_AMOUNT_LIMIT),
        ));
    }

    errors
}

/// Nothing paid means no payment date. A payment without an explicit date is
/// recorded as made today.
pub fn resolve_payment_date(
    amount_paid: Decimal,
    submitted: Option<NaiveDate>,
    today: NaiveDate,
) -> Option<NaiveDate> {
    if amount_paid <= Decimal::ZERO {
        None
    } else {
        Some(submitted.unwrap_or(today))
    }
}

/// Recomputes `amount_due` / `is_paid` from the components and attaches the remainder.
pub fn fee_view(mut record: MonthlyFeeRecord) -> FeeView {
    let computed = compute(&FeeComponents::from(&record), record.amount_paid);
    record.amount_due = computed.amount_due;
    record.is_paid = computed.is_paid;

    FeeView {
        record,
        amount_remaining: computed.amount_remaining,
    }
}

/// Sums a student's months. Only outstanding balances count towards
/// `total_remaining`; an overpaid month does not offset another month.
pub fn totals(months: &[FeeView]) -> FeeTotals {
    months.iter().fold(FeeTotals::default(), |mut acc, m| {
        acc.total_due += m.record.amount_due;
        acc.total_paid += m.record.amount_paid;
        if m.amount_remaining > Decimal::ZERO {
            acc.total_remaining += m.amount_remaining;
        }
        if !m.record.is_paid {
            acc.unpaid_months += 1;
        }
        acc
    })
}

/// Orders months newest first.
pub fn sort_months(months: &mut [FeeView]) {
    months.sort_by(|a, b| {
        b.record
            .fee_year
            .cmp(&a.record.fee_year)
            .then(b.record.fee_month.cmp(&a.record.fee_month))
    });
}

/// Groups joined fee rows by student, then by month.
/// Students are ordered by class, name and roll number, all naturally.
pub fn group_by_student(rows: Vec<StudentFeeRow>) -> Vec<StudentFeeSummary> {
    let mut groups: HashMap<i64, StudentFeeSummary> = HashMap::new();

    for row in rows {
        let student_id = row.record.student_id;
        let summary = groups.entry(student_id).or_insert_with(|| StudentFeeSummary {
            student_id,
            full_name: row.full_name.clone(),
            current_class: row.current_class.clone(),
            roll_number: row.roll_number.clone(),
            months: Vec::new(),
            totals: FeeTotals::default(),
        });
        summary.months.push(fee_view(row.record));
    }

    let mut summaries: Vec<StudentFeeSummary> = groups
        .into_values()
        .map(|mut s| {
            sort_months(&mut s.months);
            s.totals = totals(&s.months);
            s
        })
        .collect();

    summaries.sort_by(|a, b| {
        natural_cmp(&a.current_class, &b.current_class)
            .then_with(|| natural_cmp(&a.full_name, &b.full_name))
            .then_with(|| {
                natural_cmp(
                    a.roll_number.as_deref().unwrap_or(""),
                    b.roll_number.as_deref().unwrap_or(""),
                )
            })
            .then(a.student_id.cmp(&b.student_id))
    });

    summaries
}
