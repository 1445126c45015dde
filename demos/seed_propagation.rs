use seedprop::{
    build_graph_with_config, register_seeds, unreachable_nodes, verify_propagation,
    DisputePolicy, KnnGraphConfig, LevelSync, MajorityVote, Metric, NodeLabel, Symmetry,
};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // RUST_LOG=seedprop=trace shows every propagation round.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // Two cell populations plus a stray pair far from both.
    let cells: Vec<(u64, Vec<f32>)> = vec![
        // Population T (near (0,0))
        (1, vec![0.0, 0.0]),
        (2, vec![0.2, 0.1]),
        (3, vec![0.1, 0.3]),
        (4, vec![0.4, 0.2]),
        // Population B (near (5,5))
        (5, vec![5.0, 5.0]),
        (6, vec![5.2, 4.9]),
        (7, vec![4.8, 5.3]),
        (8, vec![5.1, 5.2]),
        // In between
        (9, vec![2.5, 2.5]),
        // Far away
        (10, vec![40.0, -40.0]),
        (11, vec![40.5, -40.2]),
    ];

    let config = KnnGraphConfig::new(3)
        .with_metric(Metric::Euclidean)
        .with_symmetry(Symmetry::Union);
    let graph = build_graph_with_config(&cells, &config)?;
    println!(
        "n_nodes={} n_edges={}",
        graph.node_count(),
        graph.edge_count()
    );

    let seeds = register_seeds(&graph, [(1, "T-cell"), (5, "B-cell")])?;
    println!("unreachable before propagation: {:?}", unreachable_nodes(&graph, &seeds));

    for policy in [DisputePolicy::LowestLabel, DisputePolicy::Ambiguous] {
        let result = LevelSync::new(policy).propagate(&graph, &seeds)?;
        println!("\npolicy={policy:?} max_depth={}", result.max_depth());
        for (id, state) in result.iter() {
            println!("  cell {id:>2}: {:?} depth={:?}", NodeLabel::from(state), state.depth());
        }
        for d in result.disputes() {
            println!(
                "  dispute at cell {} (depth {}): {:?} -> {:?}",
                d.node, d.depth, d.candidates, d.outcome
            );
        }
        let report = verify_propagation(&graph, &seeds, &result);
        println!("  {}", report.to_string().trim_end());
    }

    let votes = MajorityVote::new().run(&graph, &seeds)?;
    println!("\nmajority vote after {} rounds:", votes.iterations());
    for (id, label) in votes.labels() {
        println!("  cell {id:>2}: {label:?}");
    }

    Ok(())
}
