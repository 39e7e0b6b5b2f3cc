use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use bracket_ledger::ids::{CompetitorId, MatchExternalId};
use bracket_ledger::model::Competitor;
use bracket_ledger::normalize::{compare_names, normalize};
use bracket_ledger::overrides::OverrideTable;
use bracket_ledger::resolver::IdentityResolver;
use bracket_ledger::sheet::parse_draft_grid;

fn roster(n: u64) -> Vec<Competitor> {
    (0..n)
        .map(|i| Competitor {
            competitor_id: CompetitorId::new(4000 + i),
            canonical_name: format!("[T{}] Player{i:04}", i % 7),
        })
        .collect()
}

fn draft_grid(rounds: i32, games: u32) -> Vec<Vec<String>> {
    let mut grid = vec![vec!["Spring Cup draft sheet".to_string()]];
    for round in 1..=rounds {
        grid.push(vec![format!("Round {round}")]);
        for game in 1..=games {
            grid.push(vec![
                format!("Game {game}"),
                format!("Player{:04}", game * 2),
                "Franks".to_string(),
                "vs".to_string(),
                format!("Player{:04}", game * 2 + 1),
                "Mongols".to_string(),
            ]);
        }
        grid.push(vec![format!("Losers Round {round}")]);
        for game in 1..=games / 2 {
            grid.push(vec![
                format!("G{game}"),
                format!("Player{:04}", game),
                "Huns".to_string(),
                format!("Player{:04}", game + 100),
                "Goths".to_string(),
            ]);
        }
    }
    grid
}

fn bench_normalize(c: &mut Criterion) {
    let names = ["[GG] Ninja", "  Fidlr  ", "(TSM) Hera_AoE", "ÉLITE Çlan Player"];
    c.bench_function("normalize_names", |b| {
        b.iter(|| {
            for name in names {
                black_box(normalize(black_box(name)));
            }
        })
    });
    c.bench_function("compare_names", |b| {
        b.iter(|| black_box(compare_names(black_box("GG.Ghost"), black_box("[GG] Ghost"))))
    });
}

fn bench_resolver(c: &mut Criterion) {
    let competitors = roster(256);
    let overrides = OverrideTable::from_json_str(
        r#"{"9001": {"Fidlr": {"competitor_id": 4002}}}"#,
    );
    let resolver = IdentityResolver::new(&competitors, &overrides);
    c.bench_function("match_name_roster_256", |b| {
        b.iter(|| {
            black_box(resolver.match_name(black_box("Player0123")));
            black_box(resolver.match_name(black_box("Nobody")));
        })
    });
    c.bench_function("override_lookup", |b| {
        b.iter(|| black_box(overrides.lookup(MatchExternalId::new(9001), black_box("fidlr"))))
    });
}

fn bench_draft_grid(c: &mut Criterion) {
    let grid = draft_grid(8, 32);
    c.bench_function("parse_draft_grid_8x32", |b| {
        b.iter(|| black_box(parse_draft_grid(black_box(&grid)).len()))
    });
}

criterion_group!(benches, bench_normalize, bench_resolver, bench_draft_grid);
criterion_main!(benches);
