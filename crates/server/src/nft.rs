use rand::Rng;

use shared::NftCollection;

pub const COLLECTION_COUNT: usize = 100;

/// Well-known collections and their floor prices in ETH.
const FEATURED_COLLECTIONS: [(&str, &str, f64); 20] = [
    ("Bored Ape Yacht Club", "BAYC", 32.5),
    ("CryptoPunks", "PUNK", 65.2),
    ("Mutant Ape Yacht Club", "MAYC", 6.3),
    ("Azuki", "AZUKI", 15.8),
    ("CloneX", "CLONEX", 4.2),
    ("Doodles", "DOODLE", 7.5),
    ("Cool Cats", "COOL", 2.1),
    ("Moonbirds", "MOONBIRD", 5.7),
    ("World of Women", "WOW", 3.4),
    ("Meebits", "MEEB", 1.8),
    ("Otherdeed", "OTHR", 1.2),
    ("Pudgy Penguins", "PUDGY", 8.9),
    ("Bored Ape Kennel Club", "BAKC", 2.5),
    ("DeGods", "DGOD", 3.7),
    ("Murakami.Flowers", "FLOWER", 4.1),
    ("VeeFriends", "VEE", 1.5),
    ("Invisible Friends", "INVSBLE", 2.3),
    ("Gutter Cat Gang", "GCG", 1.9),
    ("Karafuru", "KARAFURU", 2.8),
    ("RTFKT - MNLTH", "MNLTH", 3.6),
];

/// There is no NFT market feed, so the page is filled with the featured
/// collections followed by synthetic ones.
pub fn generate_collections<R: Rng + ?Sized>(rng: &mut R) -> Vec<NftCollection> {
    let mut collections = Vec::with_capacity(COLLECTION_COUNT);

    for (name, symbol, floor_price) in FEATURED_COLLECTIONS {
        collections.push(NftCollection {
            name: name.to_string(),
            symbol: symbol.to_string(),
            floor_price,
            day_change: cents(rng.gen_range(-10.0..10.0)),
            week_change: cents(rng.gen_range(-15.0..15.0)),
            total_supply: rng.gen_range(5_000..15_000),
            volume_24h: cents(rng.gen_range(50.0..550.0)),
            owners: rng.gen_range(2_000..10_000),
            image: placeholder_image(symbol),
        });
    }

    for number in FEATURED_COLLECTIONS.len() + 1..=COLLECTION_COUNT {
        let symbol = format!("NFT{}", number);
        collections.push(NftCollection {
            name: format!("NFT Collection {}", number),
            floor_price: cents(rng.gen_range(0.5..30.5)),
            day_change: cents(rng.gen_range(-10.0..10.0)),
            week_change: cents(rng.gen_range(-15.0..15.0)),
            total_supply: rng.gen_range(1_000..11_000),
            volume_24h: cents(rng.gen_range(10.0..310.0)),
            owners: rng.gen_range(1_000..6_000),
            image: placeholder_image(&symbol),
            symbol,
        });
    }

    collections
}

fn placeholder_image(symbol: &str) -> String {
    format!("https://via.placeholder.com/40?text={}", symbol)
}

fn cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use shared::NftMarketStats;

    #[test]
    fn test_generates_featured_then_synthetic() {
        let collections = generate_collections(&mut StdRng::seed_from_u64(7));

        assert_eq!(collections.len(), COLLECTION_COUNT);
        assert_eq!(collections[0].name, "Bored Ape Yacht Club");
        assert_eq!(collections[1].floor_price, 65.2);
        assert_eq!(collections[19].symbol, "MNLTH");
        assert_eq!(collections[20].name, "NFT Collection 21");
        assert_eq!(collections[99].symbol, "NFT100");
        assert_eq!(collections[99].image, "https://via.placeholder.com/40?text=NFT100");
    }

    #[test]
    fn test_values_stay_in_range() {
        let collections = generate_collections(&mut StdRng::seed_from_u64(42));

        for featured in &collections[..20] {
            assert!((5_000..15_000).contains(&featured.total_supply));
            assert!((2_000..10_000).contains(&featured.owners));
            assert!((50.0..=550.0).contains(&featured.volume_24h));
        }
        for synthetic in &collections[20..] {
            assert!((0.5..=30.5).contains(&synthetic.floor_price));
            assert!((1_000..11_000).contains(&synthetic.total_supply));
            assert!((1_000..6_000).contains(&synthetic.owners));
        }
        for collection in &collections {
            assert!((-10.0..=10.0).contains(&collection.day_change));
            assert!((-15.0..=15.0).contains(&collection.week_change));
            assert_eq!(collection.day_change, cents(collection.day_change));
        }
    }

    #[test]
    fn test_same_seed_same_collections() {
        let a = generate_collections(&mut StdRng::seed_from_u64(1));
        let b = generate_collections(&mut StdRng::seed_from_u64(1));

        assert_eq!(a, b);
        assert_eq!(NftMarketStats::from_collections(&a).total_collections, 100);
    }
}
