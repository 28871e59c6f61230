//! Raw input records and their lenient conversion into a [`Truss`].
//!
//! Records arrive from a table-editing front end, so every cell may be a
//! number, a numeric string, or garbage. A row that does not parse is skipped
//! and reported; it never aborts the import.
//!
//! Rows reference nodes and properties by their one-based row number. Rows
//! that survive parsing are renumbered densely, so the model's ids match the
//! row numbers whenever nothing before them was skipped. [`Import`] keeps the
//! row-to-id maps so callers can translate row numbers the user typed.

use std::collections::HashMap;
use std::fmt;

use serde::Deserialize;

use crate::analysis::AnalysisOptions;
use crate::errors::{RecordError, TrussEditError};
use crate::geometry::Point;
use crate::truss::{Load, MemberId, NodeId, Property, PropertyId, SupportKind, Truss};

/// A single table cell.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    /// A JSON number.
    Number(f64),
    /// Text, usually a number typed by the user.
    Text(String),
    /// Anything else; never parses.
    Other(serde_json::Value),
}

impl Cell {
    /// Parse a finite number.
    fn number(cell: Option<&Cell>, field: &'static str) -> Result<f64, RecordError> {
        let value = match cell {
            Some(Cell::Number(value)) => Some(*value),
            Some(Cell::Text(text)) => text.trim().parse::<f64>().ok(),
            _ => None,
        };
        value
            .filter(|value| value.is_finite())
            .ok_or(RecordError::InvalidNumber { field })
    }

    /// Parse a one-based row number.
    fn id(cell: Option<&Cell>, field: &'static str) -> Result<usize, RecordError> {
        let id = match cell {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            Some(Cell::Number(value)) if value.fract() == 0.0 && *value >= 1.0 => {
                Some(*value as usize)
            }
            Some(Cell::Text(text)) => text.trim().parse::<usize>().ok().filter(|id| *id >= 1),
            _ => None,
        };
        id.ok_or(RecordError::InvalidId { field })
    }

    /// Read a tag, accepting whole numbers as their decimal text.
    fn text(cell: Option<&Cell>, field: &'static str) -> Result<String, RecordError> {
        match cell {
            Some(Cell::Text(text)) => Ok(text.clone()),
            Some(Cell::Number(value)) if value.fract() == 0.0 => Ok(format!("{value:.0}")),
            _ => Err(RecordError::InvalidId { field }),
        }
    }
}

/// A node row: coordinates.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct NodeRecord {
    /// Horizontal coordinate.
    #[serde(default)]
    pub x: Option<Cell>,
    /// Vertical coordinate.
    #[serde(default)]
    pub y: Option<Cell>,
}

/// A member row: end nodes and property.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct MemberRecord {
    /// Start node row.
    #[serde(default)]
    pub from: Option<Cell>,
    /// End node row.
    #[serde(default)]
    pub to: Option<Cell>,
    /// Property row; optional when exactly one property exists.
    #[serde(default)]
    pub property: Option<Cell>,
}

/// A support row: node and type tag.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct SupportRecord {
    /// Supported node row.
    #[serde(default)]
    pub node: Option<Cell>,
    /// Support type name or index.
    #[serde(default, alias = "type")]
    pub kind: Option<Cell>,
}

/// A load row: node, magnitude and direction.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct LoadRecord {
    /// Loaded node row.
    #[serde(default)]
    pub node: Option<Cell>,
    /// Load magnitude.
    #[serde(default)]
    pub magnitude: Option<Cell>,
    /// Direction in degrees from +x.
    #[serde(default)]
    pub angle: Option<Cell>,
}

/// A property row: elastic modulus and area.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct PropertyRecord {
    /// Modulus of elasticity.
    #[serde(default, alias = "e")]
    pub elastic_modulus: Option<Cell>,
    /// Cross-sectional area.
    #[serde(default, alias = "a")]
    pub area: Option<Cell>,
}

/// Every table of a project, plus analysis options.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProjectRecords {
    /// Node rows.
    pub nodes: Vec<NodeRecord>,
    /// Member rows.
    pub members: Vec<MemberRecord>,
    /// Support rows.
    pub supports: Vec<SupportRecord>,
    /// Load rows.
    pub loads: Vec<LoadRecord>,
    /// Property rows.
    pub properties: Vec<PropertyRecord>,
    /// Numerical settings.
    pub options: AnalysisOptions,
}

/// Which table a skipped row came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordTable {
    /// Node table.
    Nodes,
    /// Member table.
    Members,
    /// Support table.
    Supports,
    /// Load table.
    Loads,
    /// Property table.
    Properties,
}

impl fmt::Display for RecordTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RecordTable::Nodes => "nodes",
            RecordTable::Members => "members",
            RecordTable::Supports => "supports",
            RecordTable::Loads => "loads",
            RecordTable::Properties => "properties",
        })
    }
}

/// A row dropped during import.
#[derive(Debug, PartialEq)]
pub struct SkippedRecord {
    /// Table the row belongs to.
    pub table: RecordTable,
    /// One-based row number.
    pub row: usize,
    /// Why the row was dropped.
    pub reason: RecordError,
}

impl fmt::Display for SkippedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} row {}: {}", self.table, self.row, self.reason)
    }
}

/// Outcome of converting records into a model.
#[derive(Debug)]
pub struct Import {
    /// The model built from every row that parsed.
    pub truss: Truss,
    /// Analysis options carried by the project.
    pub options: AnalysisOptions,
    /// Rows that were dropped.
    pub skipped: Vec<SkippedRecord>,
    /// Node table row to node id.
    node_rows: HashMap<usize, NodeId>,
    /// Member table row to member id.
    member_rows: HashMap<usize, MemberId>,
}

impl Import {
    /// Node imported from a one-based node table row.
    #[must_use]
    pub fn node_id(&self, row: usize) -> Option<NodeId> {
        self.node_rows.get(&row).copied()
    }

    /// Member imported from a one-based member table row.
    #[must_use]
    pub fn member_id(&self, row: usize) -> Option<MemberId> {
        self.member_rows.get(&row).copied()
    }

    /// Node rows whose id differs from their row number, by row.
    #[must_use]
    pub fn renumbered_nodes(&self) -> Vec<(usize, NodeId)> {
        renumbered(&self.node_rows, NodeId::get)
    }

    /// Member rows whose id differs from their row number, by row.
    #[must_use]
    pub fn renumbered_members(&self) -> Vec<(usize, MemberId)> {
        renumbered(&self.member_rows, MemberId::get)
    }
}

/// Entries of a row map whose id is not the row number, sorted by row.
fn renumbered<T: Copy>(rows: &HashMap<usize, T>, id: fn(T) -> usize) -> Vec<(usize, T)> {
    let mut moved: Vec<(usize, T)> = rows
        .iter()
        .filter(|(row, value)| **row != id(**value))
        .map(|(row, value)| (*row, *value))
        .collect();
    moved.sort_unstable_by_key(|(row, _)| *row);
    moved
}

impl ProjectRecords {
    /// Parse a JSON project document.
    ///
    /// # Errors
    ///
    /// Returns the JSON error when the document is not an object of tables.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Build a model from the records, skipping rows that do not parse.
    ///
    /// # Examples
    /// ```
    /// use truss2d::ProjectRecords;
    ///
    /// let records = ProjectRecords::from_json(
    ///     r#"{ "nodes": [ { "x": "0", "y": 0 }, { "x": "oops", "y": 1 }, { "x": 4, "y": 0 } ] }"#,
    /// )?;
    /// let import = records.build();
    /// assert_eq!(import.truss.node_count(), 2);
    /// assert_eq!(import.skipped.len(), 1);
    /// # Ok::<(), serde_json::Error>(())
    /// ```
    #[must_use]
    pub fn build(&self) -> Import {
        let mut builder = Builder::default();

        for (row, record) in rows(&self.properties) {
            let property = Cell::number(record.elastic_modulus.as_ref(), "elastic_modulus")
                .and_then(|e| Ok((e, Cell::number(record.area.as_ref(), "area")?)))
                .and_then(|(e, a)| Property::new(e, a).map_err(|error| TrussEditError::from(error).into()));
            match property {
                Ok(property) => {
                    let id = builder.truss.add_property(property);
                    builder.property_rows.insert(row, id);
                }
                Err(error) => builder.skip(RecordTable::Properties, row, error),
            }
        }

        for (row, record) in rows(&self.nodes) {
            let position = Cell::number(record.x.as_ref(), "x")
                .and_then(|x| Ok(Point::new(x, Cell::number(record.y.as_ref(), "y")?)));
            match position {
                Ok(position) => {
                    let id = builder.truss.add_node(position);
                    builder.node_rows.insert(row, id);
                }
                Err(error) => builder.skip(RecordTable::Nodes, row, error),
            }
        }

        for (row, record) in rows(&self.members) {
            match builder.member(record) {
                Ok(id) => {
                    builder.member_rows.insert(row, id);
                }
                Err(error) => builder.skip(RecordTable::Members, row, error),
            }
        }

        for (row, record) in rows(&self.supports) {
            let outcome = builder.support(record);
            if let Err(error) = outcome {
                builder.skip(RecordTable::Supports, row, error);
            }
        }

        for (row, record) in rows(&self.loads) {
            let outcome = builder.load(record);
            if let Err(error) = outcome {
                builder.skip(RecordTable::Loads, row, error);
            }
        }

        log::debug!(
            "imported {} nodes, {} members, {} properties; skipped {} rows",
            builder.truss.node_count(),
            builder.truss.member_count(),
            builder.truss.property_count(),
            builder.skipped.len()
        );
        Import {
            truss: builder.truss,
            options: self.options,
            skipped: builder.skipped,
            node_rows: builder.node_rows,
            member_rows: builder.member_rows,
        }
    }
}

/// Pair each record with its one-based row number.
fn rows<T>(records: &[T]) -> impl Iterator<Item = (usize, &T)> {
    records.iter().enumerate().map(|(index, record)| (index + 1, record))
}

/// Model under construction plus the row-to-id mappings.
#[derive(Default)]
struct Builder {
    /// The model so far.
    truss: Truss,
    /// Node table row to node id.
    node_rows: HashMap<usize, NodeId>,
    /// Member table row to member id.
    member_rows: HashMap<usize, MemberId>,
    /// Property table row to property id.
    property_rows: HashMap<usize, PropertyId>,
    /// Rows dropped so far.
    skipped: Vec<SkippedRecord>,
}

impl Builder {
    /// Record a dropped row.
    fn skip(&mut self, table: RecordTable, row: usize, reason: RecordError) {
        log::warn!("skipping {table} row {row}: {reason}");
        self.skipped.push(SkippedRecord { table, row, reason });
    }

    /// Resolve a node row reference.
    fn node(&self, cell: Option<&Cell>, field: &'static str) -> Result<NodeId, RecordError> {
        let row = Cell::id(cell, field)?;
        self.node_rows
            .get(&row)
            .copied()
            .ok_or_else(|| TrussEditError::UnknownNode(NodeId::new(row)).into())
    }

    /// Resolve a property reference, falling back to the only property.
    fn property(&self, cell: Option<&Cell>) -> Result<PropertyId, RecordError> {
        match cell {
            None if self.truss.property_count() == 1 => Ok(PropertyId::new(1)),
            None => Err(RecordError::MissingProperty),
            Some(_) => {
                let row = Cell::id(cell, "property")?;
                self.property_rows
                    .get(&row)
                    .copied()
                    .ok_or_else(|| TrussEditError::UnknownProperty(PropertyId::new(row)).into())
            }
        }
    }

    /// Add one member row.
    fn member(&mut self, record: &MemberRecord) -> Result<MemberId, RecordError> {
        let from = self.node(record.from.as_ref(), "from")?;
        let to = self.node(record.to.as_ref(), "to")?;
        let property = self.property(record.property.as_ref())?;
        Ok(self.truss.add_member(from, to, property)?)
    }

    /// Add one support row.
    fn support(&mut self, record: &SupportRecord) -> Result<(), RecordError> {
        let node = self.node(record.node.as_ref(), "node")?;
        let kind: SupportKind = Cell::text(record.kind.as_ref(), "kind")?.parse()?;
        self.truss.set_support(node, kind)?;
        Ok(())
    }

    /// Add one load row.
    fn load(&mut self, record: &LoadRecord) -> Result<(), RecordError> {
        let node = self.node(record.node.as_ref(), "node")?;
        let magnitude = Cell::number(record.magnitude.as_ref(), "magnitude")?;
        let angle = Cell::number(record.angle.as_ref(), "angle")?;
        self.truss.add_load(node, Load::new(magnitude, angle))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{point, Force};

    const TRIANGLE: &str = r#"{
        "nodes": [
            { "x": 0, "y": 0 },
            { "x": "4", "y": "0" },
            { "x": 2, "y": 3 }
        ],
        "members": [
            { "from": 1, "to": 2 },
            { "from": "2", "to": 3 },
            { "from": 1, "to": 3 }
        ],
        "supports": [
            { "node": 1, "kind": "pinned" },
            { "node": 2, "type": 1 }
        ],
        "loads": [ { "node": 3, "magnitude": 10, "angle": 270 } ],
        "properties": [ { "e": 29000, "a": 1 } ]
    }"#;

    #[test]
    fn builds_model_from_mixed_cells() {
        let import = ProjectRecords::from_json(TRIANGLE).expect("valid json").build();
        assert!(import.skipped.is_empty());
        let truss = import.truss;
        assert_eq!(truss.node_count(), 3);
        assert_eq!(truss.member_count(), 3);
        assert_eq!(truss.node_position(NodeId::new(2)), Some(point(4.0, 0.0)));
        assert_eq!(truss.support(NodeId::new(2)), Some(SupportKind::HorizontalRoller));
        assert_eq!(truss.net_load(NodeId::new(3)), Force::new(0.0, -10.0));
        let member = truss.member(MemberId::new(2)).expect("member exists");
        assert_eq!((member.from, member.to), (NodeId::new(2), NodeId::new(3)));
        assert_eq!(member.property, PropertyId::new(1));
    }

    #[test]
    fn malformed_rows_are_skipped_individually() {
        let json = r#"{
            "nodes": [ { "x": 0, "y": 0 }, { "x": "abc", "y": 0 }, { "x": 3, "y": 0 } ],
            "members": [ { "from": 1, "to": 3 }, { "from": 1, "to": 2 }, { "from": 3, "to": 3 } ],
            "supports": [ { "node": 1, "kind": "fixed" }, { "node": 1, "kind": "pinned" }, { "node": 1, "kind": 2 } ],
            "loads": [ { "node": 3, "magnitude": "lots", "angle": 0 }, { "node": 3, "magnitude": 5, "angle": 0 } ],
            "properties": [ { "e": 1, "a": 1 } ]
        }"#;
        let import = ProjectRecords::from_json(json).expect("valid json").build();
        let skipped: Vec<(RecordTable, usize)> = import
            .skipped
            .iter()
            .map(|record| (record.table, record.row))
            .collect();
        assert_eq!(
            skipped,
            vec![
                (RecordTable::Nodes, 2),
                (RecordTable::Members, 2),
                (RecordTable::Members, 3),
                (RecordTable::Supports, 1),
                (RecordTable::Supports, 3),
                (RecordTable::Loads, 1),
            ]
        );
        let truss = import.truss;
        assert_eq!(truss.node_count(), 2);
        assert_eq!(truss.member_count(), 1);
        // Row 3 of the node table became node 2.
        let member = truss.member(MemberId::new(1)).expect("member exists");
        assert_eq!(member.to, NodeId::new(2));
        assert_eq!(truss.net_load(NodeId::new(2)), Force::new(5.0, 0.0));
        assert_eq!(truss.support(NodeId::new(1)), Some(SupportKind::Pinned));
    }

    #[test]
    fn row_numbers_translate_to_imported_ids() {
        let json = r#"{
            "nodes": [ { "x": 0, "y": 0 }, { "x": "abc", "y": 0 }, { "x": 3, "y": 0 }, { "x": 3, "y": 4 } ],
            "members": [ { "from": 1, "to": 2 }, { "from": 1, "to": 3 }, { "from": 3, "to": 4 } ],
            "properties": [ { "e": 1, "a": 1 } ]
        }"#;
        let import = ProjectRecords::from_json(json).expect("valid json").build();
        assert_eq!(import.node_id(1), Some(NodeId::new(1)));
        assert_eq!(import.node_id(2), None);
        assert_eq!(import.node_id(4), Some(NodeId::new(3)));
        assert_eq!(import.member_id(1), None);
        assert_eq!(import.member_id(3), Some(MemberId::new(2)));
        assert_eq!(
            import.renumbered_nodes(),
            vec![(3, NodeId::new(2)), (4, NodeId::new(3))]
        );
        assert_eq!(
            import.renumbered_members(),
            vec![(2, MemberId::new(1)), (3, MemberId::new(2))]
        );

        let member = import.truss.member(MemberId::new(2)).expect("member exists");
        assert_eq!((member.from, member.to), (NodeId::new(2), NodeId::new(3)));
    }

    #[test]
    fn members_need_a_property_when_several_exist() {
        let json = r#"{
            "nodes": [ { "x": 0, "y": 0 }, { "x": 1, "y": 0 } ],
            "members": [ { "from": 1, "to": 2 }, { "from": 1, "to": 2, "property": 2 } ],
            "properties": [ { "e": 1, "a": 1 }, { "e": 2, "a": 1 } ]
        }"#;
        let import = ProjectRecords::from_json(json).expect("valid json").build();
        assert_eq!(import.skipped.len(), 1);
        assert_eq!(import.skipped[0].reason, RecordError::MissingProperty);
        let member = import.truss.member(MemberId::new(1)).expect("member exists");
        assert_eq!(member.property, PropertyId::new(2));
    }

    #[test]
    fn invalid_property_rows_are_skipped() {
        let json = r#"{ "properties": [ { "e": 0, "a": 1 }, { "e": 5 } ] }"#;
        let import = ProjectRecords::from_json(json).expect("valid json").build();
        assert_eq!(import.truss.property_count(), 0);
        assert_eq!(import.skipped.len(), 2);
        assert_eq!(
            import.skipped[1].reason,
            RecordError::InvalidNumber { field: "area" }
        );
    }

    #[test]
    fn options_are_read_from_the_project() {
        let json = r#"{ "options": { "check_statics": false } }"#;
        let import = ProjectRecords::from_json(json).expect("valid json").build();
        assert!(!import.options.check_statics);
        assert_eq!(import.options.path_tolerance, AnalysisOptions::default().path_tolerance);
    }
}
