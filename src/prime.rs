//! Prime capacity sizing.

use tracing::warn;

/// Smallest capacity any generation may have.
pub const MIN_CAPACITY: usize = 101;

/// Largest capacity any generation may have. Growth past this pins here.
pub const MAX_CAPACITY: usize = 99991;

const _: () = assert!(MIN_CAPACITY < MAX_CAPACITY);

/// Trial-division primality test. Capacities are small, so this is plenty.
pub fn is_prime(n: usize) -> bool {
    if n < 2 {
        return false;
    }
    if n % 2 == 0 {
        return n == 2;
    }
    let mut d = 3;
    while d * d <= n {
        if n % d == 0 {
            return false;
        }
        d += 2;
    }
    true
}

/// Smallest prime `>= requested`, clamped to `[MIN_CAPACITY, MAX_CAPACITY]`.
pub fn capacity_for(requested: usize) -> usize {
    if requested <= MIN_CAPACITY {
        return MIN_CAPACITY;
    }
    if requested >= MAX_CAPACITY {
        if requested > MAX_CAPACITY {
            warn!(requested, pinned = MAX_CAPACITY, "capacity request exceeds ceiling");
        }
        return MAX_CAPACITY;
    }
    (requested..MAX_CAPACITY)
        .find(|&n| is_prime(n))
        .unwrap_or(MAX_CAPACITY)
}
