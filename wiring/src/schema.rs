//! Static registry of the eight record kinds.
//!
//! Every other component resolves a kind identifier through [`lookup`] and
//! then works from the returned [`KindDef`] (table name, ordered columns,
//! hint) instead of branching on kind names.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Column {
    /// Name shown in forms and used as the spreadsheet header.
    pub header: &'static str,
    /// SQL column in the kind's storage table.
    #[serde(skip)]
    pub storage: &'static str,
}

const fn col(name: &'static str) -> Column {
    Column {
        header: name,
        storage: name,
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct KindDef {
    /// Stable identifier; also the sheet title on export.
    pub name: &'static str,
    pub table: &'static str,
    pub hint: &'static str,
    pub columns: &'static [Column],
}

impl KindDef {
    pub fn headers(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.columns.iter().map(|c| c.header)
    }

    /// Resolve a submitted key to a column position: exact header first,
    /// then the storage name.
    pub fn position(&self, key: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.header == key)
            .or_else(|| self.columns.iter().position(|c| c.storage == key))
    }
}

static KINDS: [KindDef; 8] = [
    KindDef {
        name: "StationDrawing",
        table: "station_drawing",
        hint: "Enter station metadata (checksum, IDs, names, zone, totals, designations).",
        columns: &[
            col("checksum"),
            Column {
                header: "Station ID",
                storage: "station_id",
            },
            col("diagram_name"),
            col("station_name"),
            col("station_code"),
            col("version"),
            col("date"),
            col("drawn_by"),
            col("checked_by"),
            col("division"),
            col("zone"),
            col("total_sheet"),
            col("designation1"),
            col("designation2"),
            col("designation3"),
        ],
    },
    KindDef {
        name: "junction_box",
        table: "junction_box",
        hint: "Enter each junction box with coordinates and size/rows if available.",
        columns: &[
            col("station_id"),
            col("junction_id"),
            col("junction_name"),
            col("latitude"),
            col("longitude"),
            col("junction_size"),
            col("junction_row"),
        ],
    },
    KindDef {
        name: "circuit",
        table: "circuit",
        hint: "Define each circuit: names, junctions, row/position, terminal count, start number.",
        columns: &[
            col("circuit_id"),
            col("circuit_name"),
            col("junction_box"),
            col("junction_name"),
            col("row"),
            col("position"),
            col("terminal"),
            col("start_no"),
        ],
    },
    KindDef {
        name: "terminal",
        table: "terminal",
        hint: "Define terminal details: symbols, connections, spare status, inputs/outputs.",
        columns: &[
            col("circuit_id"),
            col("terminal_id"),
            col("terminal_name"),
            col("symbol"),
            col("input_left"),
            col("input_right"),
            col("spare"),
            col("input_connected"),
            col("output_connected"),
            col("output_left"),
            col("output_right"),
        ],
    },
    KindDef {
        name: "group",
        // `group` is reserved in most SQL dialects
        table: "group_table",
        hint: "Group terminals by circuit with terminal numbers and input/output descriptions.",
        columns: &[
            col("circuit_id"),
            col("group_id"),
            col("terminal_no"),
            col("input_output"),
            col("text"),
        ],
    },
    KindDef {
        name: "terminal_header",
        table: "terminal_header",
        hint: "Define headers (WIREFROM/WIRETO/RELAY), terminal ranges, and connection notes.",
        columns: &[
            col("circuit_id"),
            col("header_type"),
            col("terminal_start"),
            col("terminal_end"),
            col("input_output"),
            col("text"),
        ],
    },
    KindDef {
        name: "choketable",
        table: "choke_table",
        hint: "Define choke components with input/output connections for circuit filtering.",
        columns: &[
            col("circuit_id"),
            col("choke_id"),
            col("input_terminal"),
            col("output_terminal"),
            col("terminal_name"),
        ],
    },
    KindDef {
        name: "resistortable",
        table: "resistor_table",
        hint: "Define resistor components with input/output terminals and resistance values.",
        columns: &[
            col("circuit_id"),
            col("resistor_id"),
            col("input_terminal"),
            col("output_terminal"),
            col("resistor_name"),
        ],
    },
];

/// All kinds in declared order (the export sheet order).
pub fn kinds() -> &'static [KindDef] {
    &KINDS
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownKind(pub String);

impl std::fmt::Display for UnknownKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Unknown sheet: {}", self.0)
    }
}

impl std::error::Error for UnknownKind {}

/// Exact lookup by kind identifier.
pub fn lookup(name: &str) -> Result<&'static KindDef, UnknownKind> {
    KINDS
        .iter()
        .find(|k| k.name == name)
        .ok_or_else(|| UnknownKind(name.to_string()))
}

/// Name comparison used for sheet titles and header cells: surrounding
/// whitespace ignored, ASCII case folded.
pub fn names_match(found: &str, declared: &str) -> bool {
    found.trim().eq_ignore_ascii_case(declared)
}

/// Case-insensitive match of a sheet title against the kind identifiers.
pub fn find_sheet(sheet_name: &str) -> Option<&'static KindDef> {
    KINDS.iter().find(|k| names_match(sheet_name, k.name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn registry_declares_eight_kinds_in_export_order() {
        let names: Vec<&str> = kinds().iter().map(|k| k.name).collect();
        assert_eq!(
            names,
            vec![
                "StationDrawing",
                "junction_box",
                "circuit",
                "terminal",
                "group",
                "terminal_header",
                "choketable",
                "resistortable",
            ]
        );
    }

    #[test]
    fn circuit_columns_in_declared_order() {
        let circuit = lookup("circuit").unwrap();
        let headers: Vec<&str> = circuit.headers().collect();
        assert_eq!(
            headers,
            vec![
                "circuit_id",
                "circuit_name",
                "junction_box",
                "junction_name",
                "row",
                "position",
                "terminal",
                "start_no",
            ]
        );
    }

    #[test]
    fn lookup_is_exact() {
        assert!(lookup("circuit").is_ok());
        let err = lookup("Circuit").unwrap_err();
        assert_eq!(err, UnknownKind("Circuit".to_string()));
        assert!(lookup("relay").is_err());
    }

    #[test]
    fn find_sheet_ignores_case_and_padding() {
        assert_eq!(find_sheet("Circuit").unwrap().name, "circuit");
        assert_eq!(find_sheet(" CHOKETABLE ").unwrap().name, "choketable");
        assert_eq!(find_sheet("stationdrawing").unwrap().name, "StationDrawing");
        assert!(find_sheet("Sheet1").is_none());
    }

    #[test]
    fn names_match_folds_ascii_case_only() {
        assert!(names_match(" Station id ", "Station ID"));
        assert!(names_match("CIRCUIT_ID", "circuit_id"));
        assert!(!names_match("circuit id", "circuit_id"));
        // non-ASCII letters are compared as written
        assert!(!names_match("STRAßE", "strasse"));
        assert!(!names_match("ÉTAT", "état"));
    }

    #[test]
    fn station_id_header_maps_to_sql_column() {
        let station = lookup("StationDrawing").unwrap();
        let idx = station.position("Station ID").unwrap();
        assert_eq!(station.columns[idx].storage, "station_id");
        assert_eq!(station.position("station_id"), Some(idx));
        assert_eq!(station.position("nope"), None);
    }

    #[test]
    fn tables_and_storage_columns_are_unique() {
        let tables: HashSet<&str> = kinds().iter().map(|k| k.table).collect();
        assert_eq!(tables.len(), kinds().len());
        for kind in kinds() {
            let cols: HashSet<&str> = kind.columns.iter().map(|c| c.storage).collect();
            assert_eq!(cols.len(), kind.columns.len(), "duplicate column in {}", kind.name);
            assert!(!kind.hint.is_empty());
        }
    }
}
