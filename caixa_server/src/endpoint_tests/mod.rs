mod helpers;
mod ledger;
mod orders;
mod summaries;
