//! # Fare-Collection Benchmarks
//!
//! | Area | Operation | Target |
//! |------|-----------|--------|
//! | fc-01 Ticket Table | lookup at 90% load | < 1μs |
//! | fc-01 Ticket Table | fill 1601 slots | < 1ms |
//! | fare-types | encode/decode 1000 tickets | < 1ms |
//! | fare-types | roster intersection, 1000 passengers | < 100μs |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use fare_types::{decode, encode, CustomerNumber, PassengerRoster, Ticket, TicketList, Zone};
use fc_01_ticket_table::{TicketTable, DEFAULT_CAPACITY};
use rand::seq::SliceRandom;
use rand::Rng;

fn random_customers(count: usize) -> Vec<u32> {
    let mut rng = rand::thread_rng();
    let mut customers: Vec<u32> = (1..=(count as u32 * 20)).collect();
    customers.shuffle(&mut rng);
    customers.truncate(count);
    customers
}

fn tickets_for(customers: &[u32]) -> Vec<Ticket> {
    let mut rng = rand::thread_rng();
    customers
        .iter()
        .enumerate()
        .map(|(i, owner)| {
            let start_zone = rng.gen_range(1..=4);
            Ticket::new(i as u32 + 1, "2014-12-02 16:00:00", 2400, start_zone, 2, *owner)
                .expect("valid ticket")
        })
        .collect()
}

// ============================================================================
// FC-01: Ticket Table
// ============================================================================

fn bench_ticket_table(c: &mut Criterion) {
    let mut group = c.benchmark_group("fc-01-ticket-table");

    for load in [25usize, 50, 90] {
        let count = DEFAULT_CAPACITY * load / 100;
        let customers = random_customers(count);
        let mut table = TicketTable::new();
        table.add_all(tickets_for(&customers));

        group.bench_with_input(BenchmarkId::new("lookup_hit", load), &customers, |b, customers| {
            let mut i = 0;
            b.iter(|| {
                i = (i + 1) % customers.len();
                let customer = CustomerNumber::new(customers[i]).expect("non-zero");
                black_box(table.lookup(customer))
            })
        });

        let absent = CustomerNumber::new(u32::MAX).expect("non-zero");
        group.bench_with_input(BenchmarkId::new("lookup_miss", load), &table, |b, table| {
            b.iter(|| black_box(table.lookup(absent)))
        });
    }

    let full = tickets_for(&random_customers(DEFAULT_CAPACITY));
    group.throughput(Throughput::Elements(DEFAULT_CAPACITY as u64));
    group.bench_function("fill_to_capacity", |b| {
        b.iter(|| {
            let mut table = TicketTable::new();
            black_box(table.add_all(full.iter().cloned()))
        })
    });

    group.finish();
}

// ============================================================================
// FARE-TYPES: Codec and Roster
// ============================================================================

fn bench_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("fare-types-codec");

    for size in [10usize, 100, 1000] {
        let list: TicketList = tickets_for(&random_customers(size)).into();
        let bytes = encode(&list).expect("encodable");

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("encode_ticket_list", size), &list, |b, list| {
            b.iter(|| black_box(encode(list).expect("encodable")))
        });
        group.bench_with_input(BenchmarkId::new("decode_ticket_list", size), &bytes, |b, bytes| {
            b.iter(|| black_box(decode::<TicketList>(bytes).expect("decodable")))
        });
    }

    group.finish();
}

fn bench_roster(c: &mut Criterion) {
    let mut group = c.benchmark_group("fare-types-roster");
    let roster = |customers: &[u32]| {
        let mut roster = PassengerRoster::new(Zone::FIRST);
        roster.extend(customers.iter().filter_map(|c| CustomerNumber::new(*c).ok()));
        roster
    };

    for size in [10usize, 100, 1000] {
        let customers = random_customers(size);
        let a = roster(&customers);
        let b = roster(&customers[size / 10..]);
        group.bench_with_input(BenchmarkId::new("intersection", size), &(a, b), |bench, (a, b)| {
            bench.iter(|| black_box(a.intersection(b)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_ticket_table, bench_codec, bench_roster);
criterion_main!(benches);
