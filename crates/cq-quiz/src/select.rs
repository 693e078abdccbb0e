use rand::seq::index;
use rand::Rng;

/// Pick `min(count, pool.len())` distinct items from `pool` uniformly at
/// random, in random order.
pub fn pick_random_questions<T: Clone>(pool: &[T], count: usize) -> Vec<T> {
    pick_random_questions_with(&mut rand::thread_rng(), pool, count)
}

/// Like [`pick_random_questions`] with a caller-supplied random source.
pub fn pick_random_questions_with<R, T>(rng: &mut R, pool: &[T], count: usize) -> Vec<T>
where
    R: Rng + ?Sized,
    T: Clone,
{
    let amount = count.min(pool.len());
    index::sample(rng, pool.len(), amount)
        .into_iter()
        .map(|i| pool[i].clone())
        .collect()
}
