use super::types::{ProjectionSummary, Scenario, WithdrawalPolicy, YearRow};

/// Hard ceiling on simulated years, independent of the balance.
pub const MAX_PROJECTION_YEARS: u32 = 60;

pub fn project(
    initial_amount: f64,
    annual_return_rate: f64,
    annual_contribution: f64,
    withdraw_start_year: u32,
    withdraw_percent: f64,
    withdraw_amount: Option<f64>,
) -> Vec<YearRow> {
    project_scenario(&Scenario {
        initial_amount,
        annual_return_rate,
        annual_contribution,
        withdraw_start_year,
        withdraw_percent,
        withdraw_amount,
    })
}

/// Runs the year loop: withdraw, then grow, then contribute.
///
/// Withdrawals come off the start-of-year balance so growth only compounds
/// on what is left; contributions land after growth and start compounding
/// the following year. The loop ends after the first row whose end balance
/// is at or below zero, or after [`MAX_PROJECTION_YEARS`] rows. A scenario
/// that starts at or below zero produces no rows.
pub fn project_scenario(scenario: &Scenario) -> Vec<YearRow> {
    let policy = scenario.withdrawal_policy();
    let growth_factor = 1.0 + scenario.annual_return_rate / 100.0;
    let mut rows = Vec::new();
    let mut balance = scenario.initial_amount;

    if balance <= 0.0 {
        log::trace!("nothing to project from a starting balance of {balance}");
        return rows;
    }

    for year in 0..MAX_PROJECTION_YEARS {
        let start_balance = balance;
        let in_withdrawal_phase = year >= scenario.withdraw_start_year;

        let withdrawal = if in_withdrawal_phase {
            withdrawal_for_year(policy, balance)
        } else {
            0.0
        };
        balance -= withdrawal;

        balance *= growth_factor;
        let growth = balance - (start_balance - withdrawal);

        let contribution = if in_withdrawal_phase {
            0.0
        } else {
            scenario.annual_contribution
        };
        balance += contribution;

        rows.push(YearRow {
            year,
            start_balance,
            contribution,
            withdrawal,
            growth,
            end_balance: balance,
        });

        if balance <= 0.0 {
            log::trace!("balance depleted in year {year}: {balance}");
            return rows;
        }
    }

    log::trace!("projection reached the {MAX_PROJECTION_YEARS}-year horizon");
    rows
}

fn withdrawal_for_year(policy: WithdrawalPolicy, balance: f64) -> f64 {
    match policy {
        WithdrawalPolicy::FixedAmount(amount) => amount,
        WithdrawalPolicy::Percent(percent) => balance * (percent / 100.0),
    }
}

pub fn summarize(initial_amount: f64, rows: &[YearRow]) -> ProjectionSummary {
    let final_balance = rows.last().map_or(initial_amount, |row| row.end_balance);
    let depleted_year = rows
        .last()
        .filter(|row| row.end_balance <= 0.0)
        .map(|row| row.year);

    ProjectionSummary {
        years: rows.len(),
        final_balance,
        depleted_year,
        total_contributions: rows.iter().map(|row| row.contribution).sum(),
        total_withdrawals: rows.iter().map(|row| row.withdrawal).sum(),
        total_growth: rows.iter().map(|row| row.growth).sum(),
        peak_balance: rows
            .iter()
            .map(|row| row.end_balance)
            .fold(initial_amount, f64::max),
    }
}
