//! Random digraphs with a known component structure.
//!
//! The generator works backwards from the answer: it first draws the
//! strongly connected components (sizes from a log-normal sampler over
//! a random permutation of the node ids), wires each component into a
//! cycle plus random chords, and only then adds edges between
//! components — always from an earlier to a later component in a fixed
//! order, so the condensation stays acyclic and the planted components
//! are exactly the strongly connected components of the result.
//!
//! The construction's labelling ships with the graph and serves as the
//! oracle for engine tests.

use graph_part::{Edge, Vertex};
use rand::prelude::*;

/// A generated digraph together with its component oracle.
#[derive(Clone, Debug)]
pub struct GeneratedDigraph {
    pub n: u64,
    pub edges: Vec<Edge>,
    /// `components[u]` is the smallest node id in `u`'s strongly
    /// connected component.
    pub components: Vec<Vertex>,
}

/// Generates a digraph with `n` nodes and roughly `n * avg_degree`
/// edges. Self-loops and duplicate edges may occur; neither changes the
/// component structure.
pub fn generate(n: u64, avg_degree: f64, rng: &mut impl Rng) -> GeneratedDigraph {
    if n == 0 {
        return GeneratedDigraph {
            n,
            edges: Vec::new(),
            components: Vec::new(),
        };
    }

    // Component sizes, drawn until the node budget is spent.
    let mut sizes = Vec::new();
    let mut remaining = n;
    while remaining > 0 {
        let size = log_normal(rng, 0.8, 1.0).round() as u64;
        let size = size.clamp(1, remaining);
        sizes.push(size);
        remaining -= size;
    }

    // Membership over a random permutation, so components are scattered
    // across the id range and across any partition.
    let mut ids: Vec<Vertex> = (0..n).collect();
    ids.shuffle(rng);

    let mut members: Vec<Vec<Vertex>> = Vec::with_capacity(sizes.len());
    let mut cursor = 0;
    for &size in &sizes {
        members.push(ids[cursor..cursor + size as usize].to_vec());
        cursor += size as usize;
    }

    let mut components = vec![0; n as usize];
    let mut edges = Vec::new();
    for group in &members {
        let root = *group.iter().min().expect("groups are never empty");
        for &u in group {
            components[u as usize] = root;
        }
        if group.len() > 1 {
            for window in 0..group.len() {
                edges.push(Edge {
                    u: group[window],
                    v: group[(window + 1) % group.len()],
                });
            }
        }
    }

    // Top up with chords and forward inter-component edges until the
    // degree target is met.
    let target = (n as f64 * avg_degree).round() as usize;
    while edges.len() < target {
        let a = rng.gen_range(0..members.len());
        let b = rng.gen_range(0..members.len());
        let (a, b) = (a.min(b), a.max(b));
        let u = members[a][rng.gen_range(0..members[a].len())];
        let v = members[b][rng.gen_range(0..members[b].len())];
        edges.push(Edge { u, v });
    }

    GeneratedDigraph {
        n,
        edges,
        components,
    }
}

// Box-Muller transform; avoids ln(0) by clamping the uniform draw.
fn log_normal(rng: &mut impl Rng, mu: f64, sigma: f64) -> f64 {
    let u1 = rng.gen::<f64>().max(f64::MIN_POSITIVE);
    let u2 = rng.gen::<f64>();
    let z = (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos();
    (mu + sigma * z).exp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_graph() {
        let mut rng = StdRng::seed_from_u64(1);
        let generated = generate(0, 1.0, &mut rng);

        assert_eq!(generated.n, 0);
        assert!(generated.edges.is_empty());
        assert!(generated.components.is_empty());
    }

    #[test]
    fn oracle_is_a_canonical_labelling() {
        let mut rng = StdRng::seed_from_u64(7);
        let generated = generate(100, 2.0, &mut rng);

        for (u, &root) in generated.components.iter().enumerate() {
            assert_eq!(
                generated.components[root as usize], root,
                "roots label themselves"
            );
            assert!(root <= u as Vertex, "the root is the smallest member");
        }
    }

    #[test]
    fn edges_stay_in_bounds_and_meet_the_degree_target() {
        let mut rng = StdRng::seed_from_u64(42);
        let generated = generate(64, 4.0, &mut rng);

        assert!(generated.edges.len() >= 256);
        for edge in &generated.edges {
            assert!(edge.u < 64);
            assert!(edge.v < 64);
        }
    }

    // Reference labelling by mutual reachability, affordable at test
    // sizes.
    fn reachability_components(n: usize, edges: &[Edge]) -> Vec<Vertex> {
        let mut adjacency = vec![Vec::new(); n];
        for edge in edges {
            adjacency[edge.u as usize].push(edge.v as usize);
        }

        let mut reaches = vec![vec![false; n]; n];
        for start in 0..n {
            let mut stack = vec![start];
            reaches[start][start] = true;
            while let Some(u) = stack.pop() {
                for &v in &adjacency[u] {
                    if !reaches[start][v] {
                        reaches[start][v] = true;
                        stack.push(v);
                    }
                }
            }
        }

        (0..n)
            .map(|u| {
                (0..n)
                    .find(|&v| reaches[u][v] && reaches[v][u])
                    .expect("u reaches itself") as Vertex
            })
            .collect()
    }

    #[test]
    fn oracle_matches_mutual_reachability() {
        for seed in 0..8 {
            let mut rng = StdRng::seed_from_u64(seed);
            let generated = generate(40, 1.5, &mut rng);

            let expected = reachability_components(40, &generated.edges);
            assert_eq!(generated.components, expected, "seed {seed}");
        }
    }

    #[test]
    fn same_seed_reproduces_the_graph() {
        let a = generate(32, 0.5, &mut StdRng::seed_from_u64(9));
        let b = generate(32, 0.5, &mut StdRng::seed_from_u64(9));

        assert_eq!(a.edges, b.edges);
        assert_eq!(a.components, b.components);
    }
}
