use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerReason {
    Correct,
    Wrong,
    CaseSolved,
    CaseFailed,
    Theft,
    Timeout,
    SprayWasted,
}

#[derive(Clone, Debug, Serialize)]
pub struct LedgerEntry {
    #[serde(rename = "atSecs")]
    pub at_secs: f32,
    pub reason: LedgerReason,
    pub amount: i64,
}

/// The single running balance of a shift, with every mutation recorded in
/// application order.
#[derive(Clone, Debug)]
pub struct Ledger {
    starting_balance: i64,
    balance: i64,
    entries: Vec<LedgerEntry>,
}

impl Ledger {
    pub fn new(starting_balance: i64) -> Self {
        Self {
            starting_balance,
            balance: starting_balance,
            entries: Vec::new(),
        }
    }

    pub fn apply(&mut self, reason: LedgerReason, amount: i64, at_secs: f32) -> i64 {
        self.balance += amount;
        self.entries.push(LedgerEntry {
            at_secs,
            reason,
            amount,
        });
        self.balance
    }

    pub fn balance(&self) -> i64 {
        self.balance
    }

    pub fn starting_balance(&self) -> i64 {
        self.starting_balance
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn count(&self, reason: LedgerReason) -> u32 {
        self.entries.iter().filter(|e| e.reason == reason).count() as u32
    }

    /// Rebuilds a balance from `start` by replaying the recorded entries.
    pub fn replay(&self, start: i64) -> i64 {
        self.entries.iter().fold(start, |acc, entry| acc + entry.amount)
    }

    /// (reason, count, summed amount) for every reason that occurred.
    pub fn totals(&self) -> Vec<(LedgerReason, u32, i64)> {
        let mut totals: std::collections::BTreeMap<LedgerReason, (u32, i64)> =
            std::collections::BTreeMap::new();
        for entry in &self.entries {
            let slot = totals.entry(entry.reason).or_insert((0, 0));
            slot.0 += 1;
            slot.1 += entry.amount;
        }
        totals
            .into_iter()
            .map(|(reason, (count, amount))| (reason, count, amount))
            .collect()
    }
}
