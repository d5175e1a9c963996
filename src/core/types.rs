use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Buy,
    Rent,
    Tie,
}

#[derive(Debug, Clone)]
pub struct RequiredInputs {
    pub home_price: f64,
    pub monthly_rent: f64,
    pub mortgage_rate: f64,
    pub down_pct: f64,
    pub years: u32,
}

#[derive(Debug, Clone)]
pub struct Assumptions {
    pub term_years: u32,
    pub home_appreciation: f64,
    pub rent_inflation: f64,
    pub cost_inflation: f64,
    pub invest_return: f64,
    pub prop_tax_rate: f64,
    pub home_ins_rate: f64,
    pub pmi_rate: f64,
    pub maint_rate: f64,
    pub capex_rate: f64,
    pub buy_close_pct: f64,
    pub sell_close_pct: f64,
    pub util_buy: f64,
    pub util_rent: f64,
    pub renters_ins: f64,
}

impl Default for Assumptions {
    fn default() -> Self {
        Self {
            term_years: 30,
            home_appreciation: 0.03,
            rent_inflation: 0.03,
            cost_inflation: 0.03,
            invest_return: 0.07,
            prop_tax_rate: 0.011,
            home_ins_rate: 0.0035,
            pmi_rate: 0.007,
            maint_rate: 0.01,
            capex_rate: 0.005,
            buy_close_pct: 0.03,
            sell_close_pct: 0.06,
            util_buy: 250.0,
            util_rent: 250.0,
            renters_ins: 15.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearSnapshot {
    pub year: u32,
    pub verdict: Verdict,
    pub buy_net_worth_impact: f64,
    pub rent_net_worth_impact: f64,
    pub difference: f64,
    pub buy_equity: f64,
    pub buy_out_of_pocket: f64,
    pub rent_equity: f64,
    pub rent_out_of_pocket: f64,
}

impl YearSnapshot {
    pub(crate) fn from_totals(
        year: u32,
        buy_equity: f64,
        buy_out_of_pocket: f64,
        rent_equity: f64,
        rent_out_of_pocket: f64,
    ) -> Self {
        let buy_net_worth_impact = buy_equity - buy_out_of_pocket;
        let rent_net_worth_impact = rent_equity - rent_out_of_pocket;
        let difference = buy_net_worth_impact - rent_net_worth_impact;

        let verdict = if difference > 0.0 {
            Verdict::Buy
        } else if difference < 0.0 {
            Verdict::Rent
        } else {
            Verdict::Tie
        };

        Self {
            year,
            verdict,
            buy_net_worth_impact,
            rent_net_worth_impact,
            difference,
            buy_equity,
            buy_out_of_pocket,
            rent_equity,
            rent_out_of_pocket,
        }
    }
}
