//! Commission report aggregation
//!
//! Aggregates ledger entries by agent and by place over a date range.
//! Voided entries are excluded always; Settled entries are included (a
//! report is historical, unlike the open-period candidate selection).

use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

use core_kernel::{AgentId, DateRange, PlaceId};
use domain_commission::LedgerEntry;

/// One party's aggregated totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportLine<Id> {
    pub party_id: Id,
    pub entry_count: u64,
    pub amount: Decimal,
}

/// Per-agent and per-place totals over a range.
#[derive(Debug, Clone, Serialize)]
pub struct CommissionReport {
    pub range: DateRange,
    pub agents: Vec<ReportLine<AgentId>>,
    pub places: Vec<ReportLine<PlaceId>>,
    pub admin_total: Decimal,
    pub grand_total: Decimal,
    pub entry_count: u64,
}

/// Aggregates entries into a report.
///
/// Entries outside the range or in the Voided state are skipped. Lines
/// are ordered by descending amount, ties by party id for stable output.
pub fn aggregate<'a>(
    range: DateRange,
    entries: impl IntoIterator<Item = &'a LedgerEntry>,
) -> CommissionReport {
    let mut agents: BTreeMap<AgentId, ReportLine<AgentId>> = BTreeMap::new();
    let mut places: BTreeMap<PlaceId, ReportLine<PlaceId>> = BTreeMap::new();
    let mut admin_total = Decimal::ZERO;
    let mut grand_total = Decimal::ZERO;
    let mut entry_count = 0u64;

    for entry in entries {
        if entry.is_voided() || !range.contains(entry.created_at) {
            continue;
        }
        entry_count += 1;
        grand_total += entry.total_amount;
        admin_total += entry.admin_amount;

        if let Some(agent_id) = entry.agent_id {
            let line = agents.entry(agent_id).or_insert_with(|| ReportLine {
                party_id: agent_id,
                entry_count: 0,
                amount: Decimal::ZERO,
            });
            line.entry_count += 1;
            line.amount += entry.agent_amount;
        }
        if let Some(place_id) = entry.place_id {
            let line = places.entry(place_id).or_insert_with(|| ReportLine {
                party_id: place_id,
                entry_count: 0,
                amount: Decimal::ZERO,
            });
            line.entry_count += 1;
            line.amount += entry.place_amount;
        }
    }

    let mut agents: Vec<_> = agents.into_values().collect();
    let mut places: Vec<_> = places.into_values().collect();
    agents.sort_by(|a, b| b.amount.cmp(&a.amount).then(a.party_id.cmp(&b.party_id)));
    places.sort_by(|a, b| b.amount.cmp(&a.amount).then(a.party_id.cmp(&b.party_id)));

    CommissionReport {
        range,
        agents,
        places,
        admin_total,
        grand_total,
        entry_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;
    use test_utils::{ContractBuilder, EntryBuilder};

    fn march() -> DateRange {
        DateRange::new(
            Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 4, 1, 0, 0, 0).unwrap(),
        )
        .unwrap()
    }

    fn entry_for(agent: AgentId, place: Option<PlaceId>) -> LedgerEntry {
        EntryBuilder::new()
            .contract(ContractBuilder::new().agent(Some(agent)).place(place).build())
            .created_at(Utc.with_ymd_and_hms(2025, 3, 10, 0, 0, 0).unwrap())
            .build()
    }

    #[test]
    fn test_aggregates_by_agent_and_place() {
        let agent_a = AgentId::new();
        let agent_b = AgentId::new();
        let place = PlaceId::new();

        let entries = vec![
            entry_for(agent_a, Some(place)),
            entry_for(agent_a, None),
            entry_for(agent_b, Some(place)),
        ];

        let report = aggregate(march(), &entries);

        assert_eq!(report.entry_count, 3);
        assert_eq!(report.grand_total, dec!(240.00));

        let line_a = report.agents.iter().find(|l| l.party_id == agent_a).unwrap();
        assert_eq!(line_a.entry_count, 2);
        assert_eq!(line_a.amount, dec!(32.00));

        let place_line = report.places.iter().find(|l| l.party_id == place).unwrap();
        assert_eq!(place_line.entry_count, 2);
        assert_eq!(place_line.amount, dec!(16.00));
    }

    #[test]
    fn test_voided_entries_are_excluded() {
        let agent = AgentId::new();
        let mut voided = entry_for(agent, None);
        voided.void("annulled").unwrap();
        let entries = vec![entry_for(agent, None), voided];

        let report = aggregate(march(), &entries);

        assert_eq!(report.entry_count, 1);
        assert_eq!(report.agents[0].amount, dec!(16.00));
    }

    #[test]
    fn test_settled_entries_are_included() {
        let agent = AgentId::new();
        let mut settled = entry_for(agent, None);
        settled.mark_settled().unwrap();

        let report = aggregate(march(), &[settled]);
        assert_eq!(report.entry_count, 1);
    }

    #[test]
    fn test_out_of_range_entries_are_excluded() {
        let agent = AgentId::new();
        let mut entry = entry_for(agent, None);
        entry.created_at = Utc.with_ymd_and_hms(2025, 5, 1, 0, 0, 0).unwrap();

        let report = aggregate(march(), &[entry]);
        assert_eq!(report.entry_count, 0);
        assert!(report.agents.is_empty());
    }

    #[test]
    fn test_lines_sorted_by_amount_desc() {
        let small = AgentId::new();
        let big = AgentId::new();

        let entries = vec![
            entry_for(small, None),
            entry_for(big, None),
            entry_for(big, None),
        ];

        let report = aggregate(march(), &entries);
        assert_eq!(report.agents[0].party_id, big);
        assert_eq!(report.agents[1].party_id, small);
    }
}
