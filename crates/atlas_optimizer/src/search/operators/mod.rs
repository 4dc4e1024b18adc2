pub mod cross_exchange;
pub mod exchange;
pub mod intra_cross_exchange;
pub mod intra_exchange;
pub mod intra_mixed_exchange;
pub mod intra_or_opt;
pub mod intra_relocate;
pub mod intra_two_opt;
pub mod mixed_exchange;
pub mod or_opt;
pub mod pd_shift;
pub mod priority_replace;
pub mod relocate;
pub mod reverse_two_opt;
pub mod route_exchange;
pub mod route_shift;
pub mod route_split;
pub mod swap_star;
pub mod tsp_fix;
pub mod two_opt;
pub mod unassigned_exchange;

use smallvec::SmallVec;

use crate::problem::{eval::Eval, job::JobIdx, vehicle::VehicleIdx, vrp::VehicleRoutingProblem};
use crate::search::solution::{Solution, raw_route::eval_of_sequence, tw_route::TwRoute};
use crate::search::solution_state::SolutionState;

pub type VehicleList = SmallVec<[VehicleIdx; 3]>;
pub type JobList = SmallVec<[JobIdx; 2]>;

/// Stable identity of each neighbourhood. Append-only: tie-breaking and
/// statistics depend on the discriminant order staying put.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OperatorName {
    Exchange,
    CrossExchange,
    MixedExchange,
    Relocate,
    OrOpt,
    TwoOpt,
    ReverseTwoOpt,
    RouteExchange,
    RouteShift,
    SwapStar,
    PdShift,
    UnassignedExchange,
    PriorityReplace,
    RouteSplit,
    IntraExchange,
    IntraCrossExchange,
    IntraMixedExchange,
    IntraRelocate,
    IntraOrOpt,
    IntraTwoOpt,
    TspFix,
}

impl OperatorName {
    pub const ALL: [OperatorName; 21] = [
        OperatorName::Exchange,
        OperatorName::CrossExchange,
        OperatorName::MixedExchange,
        OperatorName::Relocate,
        OperatorName::OrOpt,
        OperatorName::TwoOpt,
        OperatorName::ReverseTwoOpt,
        OperatorName::RouteExchange,
        OperatorName::RouteShift,
        OperatorName::SwapStar,
        OperatorName::PdShift,
        OperatorName::UnassignedExchange,
        OperatorName::PriorityReplace,
        OperatorName::RouteSplit,
        OperatorName::IntraExchange,
        OperatorName::IntraCrossExchange,
        OperatorName::IntraMixedExchange,
        OperatorName::IntraRelocate,
        OperatorName::IntraOrOpt,
        OperatorName::IntraTwoOpt,
        OperatorName::TspFix,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OperatorName::Exchange => "Exchange",
            OperatorName::CrossExchange => "Cross-Exchange",
            OperatorName::MixedExchange => "Mixed-Exchange",
            OperatorName::Relocate => "Relocate",
            OperatorName::OrOpt => "Or-Opt",
            OperatorName::TwoOpt => "2-Opt*",
            OperatorName::ReverseTwoOpt => "Reverse-2-Opt*",
            OperatorName::RouteExchange => "Route-Exchange",
            OperatorName::RouteShift => "Route-Shift",
            OperatorName::SwapStar => "Swap*",
            OperatorName::PdShift => "P&D-Shift",
            OperatorName::UnassignedExchange => "Unassigned-Exchange",
            OperatorName::PriorityReplace => "Priority-Replace",
            OperatorName::RouteSplit => "Route-Split",
            OperatorName::IntraExchange => "Intra-Exchange",
            OperatorName::IntraCrossExchange => "Intra-Cross-Exchange",
            OperatorName::IntraMixedExchange => "Intra-Mixed-Exchange",
            OperatorName::IntraRelocate => "Intra-Relocate",
            OperatorName::IntraOrOpt => "Intra-Or-Opt",
            OperatorName::IntraTwoOpt => "Intra-2-Opt",
            OperatorName::TspFix => "TSP-Fix",
        }
    }

    fn rank(&self) -> u8 {
        OperatorName::ALL
            .iter()
            .position(|name| name == self)
            .unwrap_or(u8::MAX as usize) as u8
    }
}

/// Deterministic ordering key for equal-gain moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TieBreaker {
    pub operator: u8,
    pub s_vehicle: usize,
    pub s_rank: usize,
    pub t_vehicle: usize,
    pub t_rank: usize,
}

impl TieBreaker {
    pub fn new(
        name: OperatorName,
        s_vehicle: VehicleIdx,
        s_rank: usize,
        t_vehicle: VehicleIdx,
        t_rank: usize,
    ) -> Self {
        TieBreaker {
            operator: name.rank(),
            s_vehicle: s_vehicle.get(),
            s_rank,
            t_vehicle: t_vehicle.get(),
            t_rank,
        }
    }
}

/// Contract shared by every move. `gain()` is memoised at construction from
/// cached evals; `is_valid()` carries the full feasibility check and must
/// cover every precondition `apply()` relies on.
pub trait LocalSearchOperator: std::fmt::Debug {
    fn name(&self) -> OperatorName;
    fn gain(&self) -> Eval;
    fn is_valid(
        &self,
        problem: &VehicleRoutingProblem,
        solution: &Solution,
        state: &SolutionState,
    ) -> bool;
    fn apply(&self, problem: &VehicleRoutingProblem, solution: &mut Solution);
    fn addition_candidates(&self) -> VehicleList;
    fn update_candidates(&self) -> VehicleList;
    fn tie_breaker(&self) -> TieBreaker;

    /// Priority delta for moves trading assigned against unassigned jobs.
    fn priority_gain(&self) -> i64 {
        0
    }

    /// Jobs that must still be unassigned for this move to stay applicable.
    fn required_unassigned(&self) -> JobList {
        JobList::new()
    }

    /// Whether a prior move touching `vehicle` makes this move's cached
    /// gain stale.
    fn invalidated_by(&self, vehicle: VehicleIdx) -> bool {
        self.update_candidates().contains(&vehicle)
    }
}

macro_rules! define_moves {
    ($($variant:ident => $ty:ty),+ $(,)?) => {
        /// A candidate modification of one or two routes, one variant per
        /// operator class.
        #[derive(Debug)]
        pub enum Move {
            $($variant($ty)),+
        }

        impl Move {
            pub fn name(&self) -> OperatorName {
                match self { $(Move::$variant(op) => op.name()),+ }
            }

            pub fn gain(&self) -> Eval {
                match self { $(Move::$variant(op) => op.gain()),+ }
            }

            pub fn priority_gain(&self) -> i64 {
                match self { $(Move::$variant(op) => op.priority_gain()),+ }
            }

            pub fn is_valid(
                &self,
                problem: &VehicleRoutingProblem,
                solution: &Solution,
                state: &SolutionState,
            ) -> bool {
                match self { $(Move::$variant(op) => op.is_valid(problem, solution, state)),+ }
            }

            pub fn apply(&self, problem: &VehicleRoutingProblem, solution: &mut Solution) {
                match self { $(Move::$variant(op) => op.apply(problem, solution)),+ }
            }

            pub fn addition_candidates(&self) -> VehicleList {
                match self { $(Move::$variant(op) => op.addition_candidates()),+ }
            }

            pub fn update_candidates(&self) -> VehicleList {
                match self { $(Move::$variant(op) => op.update_candidates()),+ }
            }

            pub fn required_unassigned(&self) -> JobList {
                match self { $(Move::$variant(op) => op.required_unassigned()),+ }
            }

            pub fn invalidated_by(&self, vehicle: VehicleIdx) -> bool {
                match self { $(Move::$variant(op) => op.invalidated_by(vehicle)),+ }
            }

            pub fn tie_breaker(&self) -> TieBreaker {
                match self { $(Move::$variant(op) => op.tie_breaker()),+ }
            }
        }
    };
}

define_moves! {
    Exchange => exchange::Exchange,
    CrossExchange => cross_exchange::CrossExchange,
    MixedExchange => mixed_exchange::MixedExchange,
    Relocate => relocate::Relocate,
    OrOpt => or_opt::OrOpt,
    TwoOpt => two_opt::TwoOpt,
    ReverseTwoOpt => reverse_two_opt::ReverseTwoOpt,
    RouteExchange => route_exchange::RouteExchange,
    RouteShift => route_shift::RouteShift,
    SwapStar => swap_star::SwapStar,
    PdShift => pd_shift::PdShift,
    UnassignedExchange => unassigned_exchange::UnassignedExchange,
    PriorityReplace => priority_replace::PriorityReplace,
    RouteSplit => route_split::RouteSplit,
    IntraExchange => intra_exchange::IntraExchange,
    IntraCrossExchange => intra_cross_exchange::IntraCrossExchange,
    IntraMixedExchange => intra_mixed_exchange::IntraMixedExchange,
    IntraRelocate => intra_relocate::IntraRelocate,
    IntraOrOpt => intra_or_opt::IntraOrOpt,
    IntraTwoOpt => intra_two_opt::IntraTwoOpt,
    TspFix => tsp_fix::TspFix,
}

/// Route-level eval of a candidate sequence, fixed vehicle cost included
/// when the sequence is non-empty.
pub(crate) fn route_eval_of(
    problem: &VehicleRoutingProblem,
    vehicle_id: VehicleIdx,
    jobs: &[JobIdx],
) -> Eval {
    let mut eval = eval_of_sequence(problem, vehicle_id, jobs);
    if !jobs.is_empty() {
        eval.cost += problem.fixed_cost(vehicle_id);
    }
    eval
}

/// What a two-job edge may do when moved as a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EdgeKind {
    /// Two independent single jobs; reversal allowed.
    Singles,
    /// A pickup immediately followed by its delivery; moves as a unit,
    /// never reversed.
    Pair,
}

pub(crate) fn movable_edge(
    problem: &VehicleRoutingProblem,
    route: &TwRoute,
    rank: usize,
) -> Option<EdgeKind> {
    let first = route.job_at(rank);
    let second = route.job_at(rank + 1);

    if problem.job(first).is_single() && problem.job(second).is_single() {
        Some(EdgeKind::Singles)
    } else if problem.job(first).is_pickup() && problem.paired_job(first) == Some(second) {
        Some(EdgeKind::Pair)
    } else {
        None
    }
}

/// Scan helper: reject candidates that cannot beat the incumbent before
/// paying for the validity check, then keep the better of the two.
pub(crate) fn consider(
    best: &mut Option<Move>,
    candidate: Move,
    problem: &VehicleRoutingProblem,
    solution: &Solution,
    state: &SolutionState,
) {
    if let Some(current) = best.as_ref() {
        let ordering = candidate
            .priority_gain()
            .cmp(&current.priority_gain())
            .then(candidate.gain().cost.total_cmp(&current.gain().cost));
        if ordering.is_lt() {
            return;
        }
    }
    if candidate.is_valid(problem, solution, state) {
        *best = better_move(best.take(), candidate);
    }
}

/// Keep the better of two candidate moves: larger priority gain first, then
/// larger cost gain, ties resolved by the smaller tie-break key.
pub(crate) fn better_move(current: Option<Move>, candidate: Move) -> Option<Move> {
    match current {
        None => Some(candidate),
        Some(current) => {
            let by_priority = candidate.priority_gain().cmp(&current.priority_gain());
            let by_gain = candidate.gain().cost.total_cmp(&current.gain().cost);
            let replace = by_priority
                .then(by_gain)
                .then_with(|| current.tie_breaker().cmp(&candidate.tie_breaker()))
                .is_gt();
            Some(if replace { candidate } else { current })
        }
    }
}
