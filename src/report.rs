use std::fmt::Write;

use truss2d::{AnalysisReport, AnalysisStatus, Import, MemberId};

/// Render the analysis report as plain-text tables.
///
/// When `member` is given only that member's influence line is printed.
#[must_use]
pub fn render_report(report: &AnalysisReport, member: Option<MemberId>) -> String {
    let mut output = String::new();

    if report.status == AnalysisStatus::Unstable {
        writeln!(
            &mut output,
            "Structure is UNSTABLE: {}",
            report.reason.as_deref().unwrap_or("no reason given")
        )
        .expect("writing to string cannot fail");
        return output;
    }
    output.push_str("Structure is stable\n");

    if let Some(displacements) = &report.displacements {
        output.push_str("\nNode displacements\n");
        writeln!(&mut output, "{:>6} {:>14} {:>14}", "node", "dx", "dy")
            .expect("writing to string cannot fail");
        for row in displacements {
            writeln!(
                &mut output,
                "{:>6} {:>+14.6e} {:>+14.6e}",
                row.node, row.displacement.x, row.displacement.y
            )
            .expect("writing to string cannot fail");
        }
    }

    if let Some(reactions) = &report.reactions {
        output.push_str("\nSupport reactions\n");
        writeln!(&mut output, "{:>6} {:>6} {:>4} {:>14}", "node", "dof", "axis", "force")
            .expect("writing to string cannot fail");
        for row in reactions {
            writeln!(
                &mut output,
                "{:>6} {:>6} {:>4} {:>+14.4}",
                row.node, row.dof, row.axis, row.force
            )
            .expect("writing to string cannot fail");
        }
    }

    if let Some(members) = &report.members {
        output.push_str("\nMember forces\n");
        writeln!(
            &mut output,
            "{:>6} {:>6} {:>6} {:>14} {:>14}  {}",
            "member", "from", "to", "force", "stress", "state"
        )
        .expect("writing to string cannot fail");
        for row in members {
            writeln!(
                &mut output,
                "{:>6} {:>6} {:>6} {:>+14.4} {:>+14.6e}  {}",
                row.member, row.from, row.to, row.force, row.stress, row.kind
            )
            .expect("writing to string cannot fail");
        }
    }

    if let Some(details) = &report.details {
        output.push_str("\nMember details\n");
        for detail in details {
            let frame = &detail.frame;
            writeln!(
                &mut output,
                "member {} ({} -> {}): L = {:.4}, cos = {:+.4}, sin = {:+.4}, E = {}, A = {}",
                frame.member,
                frame.from,
                frame.to,
                frame.length,
                frame.cos,
                frame.sin,
                frame.property.elastic_modulus,
                frame.property.area
            )
            .expect("writing to string cannot fail");
            write!(&mut output, "{:>8}", "")
                .expect("writing to string cannot fail");
            for dof in detail.dofs {
                write!(&mut output, " {:>13}", format!("dof {dof}"))
                    .expect("writing to string cannot fail");
            }
            output.push('\n');
            for (dof, row) in detail.dofs.iter().zip(detail.stiffness) {
                write!(&mut output, "{:>8}", format!("dof {dof}"))
                    .expect("writing to string cannot fail");
                for value in row {
                    write!(&mut output, " {value:>+13.4e}")
                        .expect("writing to string cannot fail");
                }
                output.push('\n');
            }
        }
    }

    if let Some(table) = &report.influence {
        writeln!(
            &mut output,
            "\nInfluence lines, unit load from node {} to node {}",
            table.start, table.end
        )
        .expect("writing to string cannot fail");
        if table.is_degenerate() {
            output.push_str("(path holds a single node)\n");
        }
        write!(&mut output, "{:>6}", "member").expect("writing to string cannot fail");
        for position in &table.positions {
            write!(&mut output, " {:>10}", format!("@{}", position.node))
                .expect("writing to string cannot fail");
        }
        output.push('\n');
        for (id, line) in &table.lines {
            if member.is_some_and(|wanted| wanted != *id) {
                continue;
            }
            write!(&mut output, "{id:>6}").expect("writing to string cannot fail");
            for ordinate in line {
                write!(&mut output, " {:>+10.4}", ordinate.force)
                    .expect("writing to string cannot fail");
            }
            output.push('\n');
        }
    }

    output
}

/// List the input rows that were dropped during import, and the rows whose
/// ids shifted as a result.
#[must_use]
pub fn render_skipped(import: &Import) -> String {
    let mut output = String::new();
    writeln!(&mut output, "Skipped {} input rows:", import.skipped.len())
        .expect("writing to string cannot fail");
    for record in &import.skipped {
        writeln!(&mut output, "  {record}").expect("writing to string cannot fail");
    }
    for (row, node) in import.renumbered_nodes() {
        writeln!(&mut output, "  node row {row} is node {node}")
            .expect("writing to string cannot fail");
    }
    for (row, member) in import.renumbered_members() {
        writeln!(&mut output, "  member row {row} is member {member}")
            .expect("writing to string cannot fail");
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use truss2d::{
        analyze, point, AnalysisOptions, Load, NodeId, Property, ProjectRecords, SupportKind,
        Truss,
    };

    fn triangle() -> Truss {
        let mut truss = Truss::new();
        let property = truss.add_property(Property::new(29_000.0, 1.0).expect("valid property"));
        let a = truss.add_node(point(0.0, 0.0));
        let b = truss.add_node(point(4.0, 0.0));
        let c = truss.add_node(point(2.0, 3.0));
        truss.add_member(a, b, property).expect("valid member");
        truss.add_member(b, c, property).expect("valid member");
        truss.add_member(a, c, property).expect("valid member");
        truss.set_support(a, SupportKind::Pinned).expect("support applied");
        truss
            .set_support(b, SupportKind::HorizontalRoller)
            .expect("support applied");
        truss.add_load(c, Load::new(10.0, 270.0)).expect("load applied");
        truss
    }

    #[test]
    fn stable_report_lists_every_table() {
        let truss = triangle();
        let outcome = analyze(&truss, &AnalysisOptions::default());
        let report = AnalysisReport::from_outcome(&outcome).with_details(&outcome);
        let text = render_report(&report, None);
        assert!(text.starts_with("Structure is stable"));
        assert!(text.contains("Node displacements"));
        assert!(text.contains("Support reactions"));
        assert!(text.contains("Member forces"));
        assert!(text.contains("compression"));
        assert!(text.contains("member 1 (1 -> 2)"));
    }

    #[test]
    fn unstable_report_prints_only_the_reason() {
        let mut truss = triangle();
        truss.remove_support(NodeId::new(2)).expect("support removed");
        let outcome = analyze(&truss, &AnalysisOptions::default());
        let text = render_report(&AnalysisReport::from_outcome(&outcome), None);
        assert!(text.starts_with("Structure is UNSTABLE"));
        assert!(!text.contains("Member forces"));
    }

    #[test]
    fn influence_table_can_be_filtered_to_one_member() {
        let truss = triangle();
        let outcome = analyze(&truss, &AnalysisOptions::default());
        let table = outcome
            .as_ref()
            .expect("stable")
            .influence_lines(NodeId::new(1), NodeId::new(2))
            .expect("valid path");
        let report = AnalysisReport::from_outcome(&outcome).with_influence(table);
        let text = render_report(&report, Some(MemberId::new(3)));
        assert!(text.contains("from node 1 to node 2"));
        let rows: Vec<&str> = text
            .lines()
            .skip_while(|line| !line.starts_with("Influence"))
            .skip(2)
            .collect();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].trim_start().starts_with('3'));
    }

    #[test]
    fn skipped_rows_list_shifted_ids() {
        let json = r#"{
            "nodes": [ { "x": 0, "y": 0 }, { "x": "abc", "y": 0 }, { "x": 3, "y": 0 } ],
            "members": [ { "from": 1, "to": 3 } ],
            "properties": [ { "e": 1, "a": 1 } ]
        }"#;
        let import = ProjectRecords::from_json(json).expect("valid json").build();
        let text = render_skipped(&import);
        assert!(text.starts_with("Skipped 1 input rows:"));
        assert!(text.contains("nodes row 2"));
        assert!(text.contains("node row 3 is node 2"));
        assert!(!text.contains("member row"));
    }
}
