use serde::Serialize;

/// How withdrawal-phase years size their withdrawal.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum WithdrawalPolicy {
    /// Percent of the start-of-year balance.
    Percent(f64),
    /// The same fixed amount every year, regardless of balance.
    FixedAmount(f64),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    pub initial_amount: f64,
    /// Percent per year, e.g. `7.0` for 7 %.
    pub annual_return_rate: f64,
    pub annual_contribution: f64,
    /// First 0-based year in which withdrawals are taken and contributions stop.
    pub withdraw_start_year: u32,
    /// Percent per year, used only when `withdraw_amount` is `None`.
    pub withdraw_percent: f64,
    pub withdraw_amount: Option<f64>,
}

impl Scenario {
    pub fn withdrawal_policy(&self) -> WithdrawalPolicy {
        match self.withdraw_amount {
            Some(amount) => WithdrawalPolicy::FixedAmount(amount),
            None => WithdrawalPolicy::Percent(self.withdraw_percent),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearRow {
    pub year: u32,
    pub start_balance: f64,
    pub contribution: f64,
    pub withdrawal: f64,
    pub growth: f64,
    pub end_balance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionSummary {
    pub years: usize,
    pub final_balance: f64,
    pub depleted_year: Option<u32>,
    pub total_contributions: f64,
    pub total_withdrawals: f64,
    pub total_growth: f64,
    pub peak_balance: f64,
}
