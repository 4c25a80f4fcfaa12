use std::sync::atomic::{AtomicUsize, Ordering};

/// Round-robins across a fixed list of local target addresses (spec §4.5):
/// monotonic index modulo length, so target `i` of `K` receives roughly
/// every `K`th stream regardless of how many streams arrive.
pub struct RoundRobin {
    targets: Vec<String>,
    next: AtomicUsize,
}

impl RoundRobin {
    pub fn new(targets: Vec<String>) -> Self {
        Self {
            targets,
            next: AtomicUsize::new(0),
        }
    }

    pub fn next_target(&self) -> &str {
        let i = self.next.fetch_add(1, Ordering::Relaxed) % self.targets.len();
        &self.targets[i]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distributes_in_round_robin_order() {
        let rr = RoundRobin::new(vec![
            "127.0.0.1:9001".to_string(),
            "127.0.0.1:9002".to_string(),
            "127.0.0.1:9003".to_string(),
        ]);
        let picks: Vec<&str> = (0..7).map(|_| rr.next_target()).collect();
        assert_eq!(
            picks,
            vec![
                "127.0.0.1:9001",
                "127.0.0.1:9002",
                "127.0.0.1:9003",
                "127.0.0.1:9001",
                "127.0.0.1:9002",
                "127.0.0.1:9003",
                "127.0.0.1:9001",
            ]
        );
    }

    #[test]
    fn matches_expected_distribution_for_seven_streams_three_targets() {
        let rr = RoundRobin::new(vec!["a".into(), "b".into(), "c".into()]);
        let mut counts = [0usize; 3];
        for _ in 0..7 {
            let target = rr.next_target();
            let idx = ["a", "b", "c"].iter().position(|t| *t == target).unwrap();
            counts[idx] += 1;
        }
        assert_eq!(counts, [3, 2, 2]);
    }
}
