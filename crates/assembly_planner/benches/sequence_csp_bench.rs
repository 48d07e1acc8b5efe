//! Criterion benchmarks for the assembly sequence CSP (group "sequence_csp").
//! Focus sizes: a chain of N elements, N in {4, 8, 16, 32}.

use assembly_planner::assembly_network::AssemblyNetwork;
use assembly_planner::config::PlannerConfig;
use assembly_planner::geometry::{Element, JointVector, LayerId, NodeId, Point, RigidBody};
use assembly_planner::oracles::{CollisionOracle, EndEffectorCollisionOracle, IkOracle};
use assembly_planner::sequence_csp::{SearchDirection, SequenceCsp};
use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use std::collections::HashSet;

struct FreeEe;
impl EndEffectorCollisionOracle for FreeEe {
    fn collides(&self, _pose: &assembly_planner::geometry::Pose, _body: &RigidBody) -> bool {
        false
    }
}

struct FreeCollision;
impl CollisionOracle for FreeCollision {
    fn in_collision(&self, _joints: &JointVector) -> bool {
        false
    }
}

struct SingleSolutionIk {
    dof: usize,
}
impl IkOracle for SingleSolutionIk {
    fn solve(&self, pose: &assembly_planner::geometry::Pose) -> Vec<JointVector> {
        let base = pose.translation.vector.x;
        vec![(0..self.dof).map(|j| base + j as f64 * 0.01).collect()]
    }
    fn dof(&self) -> usize {
        self.dof
    }
}

/// A chain of `n` elements, node 0 grounded, each node colinear.
fn build_chain(n: usize) -> AssemblyNetwork {
    let pts: Vec<Point> = (0..=n).map(|i| Point::new(i as f64, 0.0, 0.0)).collect();
    let mut ground = HashSet::new();
    ground.insert(NodeId(0));
    let elements: Vec<Element> = (0..n)
        .map(|i| Element {
            id: assembly_planner::geometry::ElementId(i as u32),
            endpoints: (NodeId(i as u32), NodeId(i as u32 + 1)),
            layer: LayerId(i as i32),
            body: RigidBody::new(i as u64, format!("element-{i}")),
        })
        .collect();
    AssemblyNetwork::build(elements, pts, &ground).unwrap()
}

fn bench_solve_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("sequence_csp");
    let ee = FreeEe;
    let ik = SingleSolutionIk { dof: 4 };
    let collision = FreeCollision;
    for &n in &[4usize, 8, 16, 32] {
        group.bench_with_input(BenchmarkId::new("solve_forward_chain", n), &n, |b, &n| {
            b.iter_batched(
                || build_chain(n),
                |net| {
                    let cfg = PlannerConfig {
                        phi_disc: 4,
                        theta_disc: 4,
                        check_ik_during_pruning: false,
                        ..PlannerConfig::default()
                    };
                    let mut csp = SequenceCsp::new(&net, SearchDirection::Forward, &ee, &ik, &collision, &cfg);
                    csp.solve(None).unwrap()
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

criterion_group!(benches, bench_solve_chain);
criterion_main!(benches);
