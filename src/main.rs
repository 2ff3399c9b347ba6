use soseg::WeightedIndex;
use tracing::Level;

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(Level::TRACE)
        .with_target(false)
        .init();

    let mut index = WeightedIndex::new();
    for (key, weight) in [(0, 1), (1, 3), (2, 4), (3, 1), (4, 2)] {
        index.put(key, weight);
    }
    print!("{}", index.dump());
    println!("total: {}, entries: {}", index.total(), index.len());

    for key in index.keys() {
        if let Some((weight, offset)) = index.get(key) {
            println!("key {}: range {}..{}", key, offset, offset + weight);
        }
    }

    for seed in ["epoch 1", "epoch 2", "epoch 3"] {
        println!("draw {:?}: {:?}", seed, index.draw(seed.as_bytes()));
    }
    println!("committee: {:?}", index.select(b"epoch 1", 3));

    index.remove(&2);
    print!("{}", index.dump());
}
