mod minor_units;

pub mod op;

pub use minor_units::{MinorUnits, MinorUnitsConversionError, LEDGER_CURRENCY_CODE};
