// Integration tests for the ancestor relation:
//   transitivity through intermediate resolutions, identity, parsing.

use hexcover::{ancestor, cell_at, parse_cell, parse_resolution, Position, Resolution};

fn resolutions(from: u8, to: u8) -> impl Iterator<Item = Resolution> {
    (from..=to).filter_map(parse_resolution)
}

fn samples() -> Vec<Position> {
    vec![
        Position::new(-157.8583, 21.3069),
        Position::new(-155.0868, 19.7241),
        Position::new(-159.5261, 22.0964),
        Position::new(0.5, 0.5),
        Position::new(179.9999, -45.0),
    ]
}

#[test]
fn ancestor_is_transitive_through_intermediate_resolutions() {
    for position in samples() {
        let cell = cell_at(position, Resolution::Fourteen).unwrap();
        for coarse in resolutions(0, 13) {
            let direct = ancestor(cell, coarse).unwrap();
            for middle in resolutions(u8::from(coarse), 14) {
                let through = ancestor(cell, middle).and_then(|m| ancestor(m, coarse));
                assert_eq!(through, Some(direct), "{cell:?} via {middle:?} to {coarse:?}");
            }
        }
    }
}

#[test]
fn ancestor_has_requested_resolution() {
    let cell = cell_at(samples()[0], Resolution::Twelve).unwrap();
    for res in resolutions(0, 12) {
        assert_eq!(ancestor(cell, res).map(|a| a.resolution()), Some(res));
    }
}

#[test]
fn ancestor_round_trips_through_its_string_code() {
    let cell = cell_at(samples()[1], Resolution::Ten).unwrap();
    let parent = ancestor(cell, Resolution::Seven).unwrap();
    assert_eq!(parse_cell(&parent.to_string()), Some(parent));
    assert_eq!(parent.to_string().len(), 15);
}
