mod ledger;

pub use ledger::HistoryLedger;
