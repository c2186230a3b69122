//! Downloadable CSV template.

use csv::WriterBuilder;

use crate::domain::Error;

use super::columns::Column;

/// Suggested file name for the template download.
pub const TEMPLATE_FILE_NAME: &str = "template_import_invento.csv";

const EXAMPLE_ROWS: [[&str; 13]; 2] = [
    [
        "J005",
        "J006",
        "",
        "1",
        "ANTIMO SIRSAK GOLDEN CAIR 30 M2",
        "3000",
        "3200",
        "",
        "3500",
        "3700",
        "",
        "100",
        "Obat",
    ],
    [
        "J008",
        "J009",
        "",
        "2",
        "ANTIMO SIRSAK GOLDEN CAIR 60 M",
        "5000",
        "5200",
        "",
        "5500",
        "5700",
        "",
        "50",
        "Obat",
    ],
];

/// Render the canonical header plus two example rows.
pub fn template_csv() -> Result<String, Error> {
    let mut writer = WriterBuilder::new().from_writer(Vec::new());
    let render = |err: csv::Error| Error::internal(format!("failed to render template: {err}"));
    writer
        .write_record(Column::ALL.map(Column::canonical))
        .map_err(render)?;
    for row in EXAMPLE_ROWS {
        writer.write_record(row).map_err(render)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|err| Error::internal(format!("failed to render template: {err}")))?;
    String::from_utf8(bytes)
        .map_err(|err| Error::internal(format!("template is not valid UTF-8: {err}")))
}
