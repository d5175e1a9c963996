use super::types::{Assumptions, RequiredInputs, YearSnapshot};

#[derive(Debug)]
struct SimulationState {
    home_value: f64,
    rent: f64,
    loan_balance: f64,
    buy_out_of_pocket: f64,
    rent_out_of_pocket: f64,
    equity_from_principal: f64,
    buy_invested: f64,
    rent_invested: f64,
    util_buy: f64,
    util_rent: f64,
    renters_ins: f64,
}

impl SimulationState {
    fn buy_equity(&self, down_payment: f64, purchase_price: f64) -> f64 {
        down_payment
            + self.equity_from_principal
            + (self.home_value - purchase_price)
            + self.buy_invested
    }
}

pub fn run_model(required: &RequiredInputs, assumptions: &Assumptions) -> Vec<YearSnapshot> {
    let months = required.years * 12;
    let term_months = assumptions.term_years * 12;

    let down_payment = required.home_price * required.down_pct;
    let loan_amount = required.home_price - down_payment;
    let payment = monthly_payment(loan_amount, required.mortgage_rate, term_months);

    let monthly_appreciation = monthly_equivalent_rate(assumptions.home_appreciation);
    let monthly_rent_inflation = monthly_equivalent_rate(assumptions.rent_inflation);
    let monthly_cost_inflation = monthly_equivalent_rate(assumptions.cost_inflation);
    let monthly_invest_return = monthly_equivalent_rate(assumptions.invest_return);

    // Amounts that inflate over time live in per-run state, so a run never
    // writes back into the caller's inputs.
    let mut state = SimulationState {
        home_value: required.home_price,
        rent: required.monthly_rent,
        loan_balance: loan_amount,
        buy_out_of_pocket: down_payment + required.home_price * assumptions.buy_close_pct,
        rent_out_of_pocket: 0.0,
        equity_from_principal: 0.0,
        buy_invested: 0.0,
        rent_invested: 0.0,
        util_buy: assumptions.util_buy,
        util_rent: assumptions.util_rent,
        renters_ins: assumptions.renters_ins,
    };

    let mut rows = Vec::with_capacity(required.years as usize + 1);
    rows.push(YearSnapshot::from_totals(
        0,
        state.buy_equity(down_payment, required.home_price),
        state.buy_out_of_pocket,
        state.rent_invested,
        state.rent_out_of_pocket,
    ));

    for month in 1..=months {
        let mut interest = 0.0;
        let mut principal = 0.0;
        if state.loan_balance > 0.0 {
            // Amortization uses the nominal monthly rate, unlike the
            // compounding-equivalent transform applied to the other rates.
            interest = state.loan_balance * (required.mortgage_rate / 12.0);
            principal = (payment - interest).min(state.loan_balance);
            state.loan_balance = (state.loan_balance - principal).max(0.0);
        }

        // PMI is charged on the original loan amount while the loan started
        // under 20% down and LTV is still above 80%.
        let mut pmi = 0.0;
        if required.down_pct < 0.20 && state.loan_balance > 0.0 {
            let ltv = state.loan_balance / state.home_value;
            if ltv > 0.80 {
                pmi = loan_amount * assumptions.pmi_rate / 12.0;
            }
        }

        // Recurring ownership costs scale with the current home value, not
        // the purchase price.
        let prop_tax = state.home_value * assumptions.prop_tax_rate / 12.0;
        let home_ins = state.home_value * assumptions.home_ins_rate / 12.0;
        let maintenance = state.home_value * assumptions.maint_rate / 12.0;
        let capex = state.home_value * assumptions.capex_rate / 12.0;

        let buy_outflow = principal
            + interest
            + prop_tax
            + home_ins
            + pmi
            + maintenance
            + capex
            + state.util_buy;
        state.buy_out_of_pocket += buy_outflow;
        state.equity_from_principal += principal;

        state.home_value *= 1.0 + monthly_appreciation;

        let rent_outflow = state.rent + state.renters_ins + state.util_rent;
        state.rent_out_of_pocket += rent_outflow;

        // This month's outflows used the pre-inflation levels; bump them for
        // next month.
        state.rent *= 1.0 + monthly_rent_inflation;
        state.util_buy *= 1.0 + monthly_cost_inflation;
        state.util_rent *= 1.0 + monthly_cost_inflation;
        state.renters_ins *= 1.0 + monthly_cost_inflation;

        // Growth lands before the month's contribution, so a new surplus
        // earns nothing until the following month.
        state.buy_invested *= 1.0 + monthly_invest_return;
        state.rent_invested *= 1.0 + monthly_invest_return;

        let surplus = rent_outflow - buy_outflow;
        if surplus > 0.0 {
            state.buy_invested += surplus;
        } else if surplus < 0.0 {
            state.rent_invested += -surplus;
        }

        if month % 12 == 0 {
            // Selling costs exist only at the end of the horizon; they adjust
            // the emitted total, never the running accumulator.
            let mut buy_out_of_pocket = state.buy_out_of_pocket;
            if month == months {
                buy_out_of_pocket += state.home_value * assumptions.sell_close_pct;
            }

            rows.push(YearSnapshot::from_totals(
                month / 12,
                state.buy_equity(down_payment, required.home_price),
                buy_out_of_pocket,
                state.rent_invested,
                state.rent_out_of_pocket,
            ));
        }
    }

    rows
}

fn monthly_payment(principal: f64, annual_rate: f64, term_months: u32) -> f64 {
    let monthly_rate = annual_rate / 12.0;
    if monthly_rate == 0.0 {
        return principal / f64::from(term_months);
    }

    let growth = (1.0 + monthly_rate).powi(term_months as i32);
    principal * (monthly_rate * growth) / (growth - 1.0)
}

fn monthly_equivalent_rate(annual: f64) -> f64 {
    (1.0 + annual).powf(1.0 / 12.0) - 1.0
}
