mod format;
mod json;
mod table;

pub(crate) use json::{output_pivot_json, output_records_json, output_series_json, output_totals_json};
pub(crate) use table::{
    TableOptions, print_pivot_table, print_records_table, print_series_table, print_totals_table,
    print_warnings,
};
