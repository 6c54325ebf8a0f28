use bytes::Bytes;
use poidex::{CategoryTaxonomy, Config, MultiTreeIndex, Poi, PoiIndex, PoidexError, VolumeIndex};

fn shop_taxonomy() -> CategoryTaxonomy {
    CategoryTaxonomy::from_categories([
        ("root".to_string(), None),
        ("shop".to_string(), Some("root".to_string())),
        ("shop=bakery".to_string(), Some("shop".to_string())),
        ("shop=butcher".to_string(), Some("shop".to_string())),
        ("amenity".to_string(), Some("root".to_string())),
        ("amenity=cafe".to_string(), Some("amenity".to_string())),
    ])
    .unwrap()
}

fn berlin_rect() -> geo::Rect {
    geo::Rect::new(
        geo::coord! { x: 13.0, y: 52.0 },
        geo::coord! { x: 14.0, y: 53.0 },
    )
}

fn bakery() -> Poi {
    Poi::new(1, 13.4050, 52.5200, "shop=bakery", Bytes::from_static(b"bakery"))
}

/// Run the 3-level taxonomy scenario against any backend.
fn ancestor_visibility_scenario<I: PoiIndex>(index: &mut I) {
    index.insert_poi(bakery()).unwrap();

    for category in ["shop=bakery", "shop", "root"] {
        let found = index.find_in_rect(&berlin_rect(), category, 0);
        assert_eq!(found.len(), 1, "poi invisible under {category}");
        assert_eq!(found[0].id, 1);
    }
    // Not visible under a sibling subtree.
    assert!(index.find_in_rect(&berlin_rect(), "amenity", 0).is_empty());
    assert!(index.find_in_rect(&berlin_rect(), "shop=butcher", 0).is_empty());

    assert!(index.remove_poi(1).unwrap());
    for category in ["shop=bakery", "shop", "root"] {
        assert!(
            index.find_in_rect(&berlin_rect(), category, 0).is_empty(),
            "poi still visible under {category} after removal"
        );
    }
    // Removing again is a no-op.
    assert!(!index.remove_poi(1).unwrap());
}

#[test]
fn test_ancestor_visibility_multi_tree() {
    ancestor_visibility_scenario(&mut MultiTreeIndex::new(shop_taxonomy()));
}

#[test]
fn test_ancestor_visibility_volume() {
    ancestor_visibility_scenario(&mut VolumeIndex::new(shop_taxonomy()));
}

/// Both backends must answer identically over a mixed dataset.
#[test]
fn test_backends_agree() {
    let mut multi = MultiTreeIndex::new(shop_taxonomy());
    let mut volume = VolumeIndex::new(shop_taxonomy());

    let categories = ["shop=bakery", "shop=butcher", "amenity=cafe", "shop", "amenity"];
    let mut id = 0u64;
    for i in 0..20 {
        for j in 0..10 {
            let poi = Poi::new(
                id,
                13.0 + f64::from(i) * 0.05,
                52.0 + f64::from(j) * 0.1,
                categories[(id % categories.len() as u64) as usize],
                Bytes::new(),
            );
            multi.insert_poi(poi.clone()).unwrap();
            volume.insert_poi(poi).unwrap();
            id += 1;
        }
    }

    let queries = [
        berlin_rect(),
        geo::Rect::new(
            geo::coord! { x: 13.2, y: 52.3 },
            geo::coord! { x: 13.6, y: 52.7 },
        ),
        geo::Rect::new(
            geo::coord! { x: 0.0, y: 0.0 },
            geo::coord! { x: 1.0, y: 1.0 },
        ),
    ];
    for rect in &queries {
        for category in ["root", "shop", "amenity", "shop=bakery", "amenity=cafe"] {
            let mut from_multi: Vec<u64> = multi
                .find_in_rect(rect, category, 0)
                .into_iter()
                .map(|poi| poi.id)
                .collect();
            let mut from_volume: Vec<u64> = volume
                .find_in_rect(rect, category, 0)
                .into_iter()
                .map(|poi| poi.id)
                .collect();
            from_multi.sort_unstable();
            from_volume.sort_unstable();
            assert_eq!(from_multi, from_volume, "backends disagree on {category}");
        }
    }
}

#[test]
fn test_pack_insert_matches_incremental() {
    let pois: Vec<Poi> = (0..500u64)
        .map(|id| {
            Poi::new(
                id,
                13.0 + (id as f64 * 0.001),
                52.0 + ((id % 97) as f64 * 0.01),
                if id % 2 == 0 { "shop=bakery" } else { "shop=butcher" },
                Bytes::new(),
            )
        })
        .collect();

    let mut packed = MultiTreeIndex::new(shop_taxonomy());
    packed.pack_insert(pois.clone()).unwrap();

    let mut incremental = MultiTreeIndex::new(shop_taxonomy());
    for poi in pois {
        incremental.insert_poi(poi).unwrap();
    }

    for category in ["shop", "shop=bakery", "root"] {
        let mut a: Vec<u64> = packed
            .find_in_rect(&berlin_rect(), category, 0)
            .into_iter()
            .map(|poi| poi.id)
            .collect();
        let mut b: Vec<u64> = incremental
            .find_in_rect(&berlin_rect(), category, 0)
            .into_iter()
            .map(|poi| poi.id)
            .collect();
        a.sort_unstable();
        b.sort_unstable();
        assert_eq!(a, b);
    }
}

#[test]
fn test_pack_insert_requires_empty_index() {
    let mut index = VolumeIndex::new(shop_taxonomy());
    index.insert_poi(bakery()).unwrap();
    let result = index.pack_insert(vec![Poi::new(2, 13.0, 52.0, "shop", Bytes::new())]);
    assert!(matches!(result, Err(PoidexError::IndexNotEmpty)));
}

#[test]
fn test_unknown_category_insert_fails_find_is_empty() {
    let mut index = MultiTreeIndex::new(shop_taxonomy());
    let ghost = Poi::new(9, 13.0, 52.0, "ghost", Bytes::new());
    assert!(matches!(
        index.insert_poi(ghost),
        Err(PoidexError::UnknownCategory(_))
    ));
    assert!(index.find_in_rect(&berlin_rect(), "ghost", 0).is_empty());
}

#[test]
fn test_duplicate_id_rejected() {
    let mut index = VolumeIndex::new(shop_taxonomy());
    index.insert_poi(bakery()).unwrap();
    assert!(matches!(
        index.insert_poi(bakery()),
        Err(PoidexError::DuplicatePoi(1))
    ));
}

#[test]
fn test_out_of_range_coordinates_rejected() {
    let mut index = MultiTreeIndex::new(shop_taxonomy());
    let poi = Poi::new(5, 200.0, 52.0, "shop", Bytes::new());
    assert!(matches!(
        index.insert_poi(poi),
        Err(PoidexError::InvalidCoordinate { .. })
    ));
    assert!(index.is_empty());
}

#[test]
fn test_limit_caps_results() {
    let mut index = MultiTreeIndex::new(shop_taxonomy());
    for id in 0..50u64 {
        index
            .insert_poi(Poi::new(
                id,
                13.5 + (id as f64) * 1e-6,
                52.5,
                "shop=bakery",
                Bytes::new(),
            ))
            .unwrap();
    }
    assert_eq!(index.find_in_rect(&berlin_rect(), "shop", 10).len(), 10);
    assert_eq!(index.find_in_rect(&berlin_rect(), "shop", 0).len(), 50);
}

#[test]
fn test_purge_resets_backend() {
    let mut index = VolumeIndex::new(shop_taxonomy());
    for id in 0..100u64 {
        index
            .insert_poi(Poi::new(
                id,
                13.0 + (id as f64) * 0.001,
                52.5,
                "shop=bakery",
                Bytes::new(),
            ))
            .unwrap();
    }
    index.purge();
    assert!(index.is_empty());
    assert_eq!(index.stats().pages, 0);
    assert!(index.find_in_rect(&berlin_rect(), "root", 0).is_empty());

    index.insert_poi(bakery()).unwrap();
    assert_eq!(index.find_in_rect(&berlin_rect(), "shop", 0).len(), 1);
}

#[test]
fn test_custom_config_small_pages() {
    let config = Config::default()
        .with_page_capacity(4)
        .with_cooperating_siblings(2);
    let mut index = MultiTreeIndex::with_config(shop_taxonomy(), &config).unwrap();
    for id in 0..200u64 {
        index
            .insert_poi(Poi::new(
                id,
                13.0 + (id as f64) * 0.004,
                52.0 + ((id % 13) as f64) * 0.07,
                "shop=bakery",
                Bytes::new(),
            ))
            .unwrap();
    }
    assert_eq!(index.len(), 200);
    assert_eq!(index.find_in_rect(&berlin_rect(), "root", 0).len(), 200);

    for id in (0..200u64).step_by(2) {
        assert!(index.remove_poi(id).unwrap());
    }
    assert_eq!(index.find_in_rect(&berlin_rect(), "root", 0).len(), 100);
}

#[test]
fn test_invalid_config_rejected() {
    let config = Config::default().with_page_capacity(1);
    assert!(matches!(
        MultiTreeIndex::with_config(shop_taxonomy(), &config),
        Err(PoidexError::InvalidConfig(_))
    ));
}
