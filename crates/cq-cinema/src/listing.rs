use rand::seq::index;
use rand::Rng;

use crate::cinema::Cinema;

/// Madrid city centre (Puerta del Sol).
const BASE_LATITUDE: f64 = 40.4168;
const BASE_LONGITUDE: f64 = -3.7038;
/// Full width of the jitter box in degrees; ±0.02° is roughly ±2 km.
const JITTER_DEGREES: f64 = 0.04;

const POPULAR_MOVIES: &[&str] = &[
    "Dune: Part Two",
    "Oppenheimer",
    "Deadpool & Wolverine",
    "Inside Out 2",
    "Gladiator II",
    "Alien: Romulus",
    "Poor Things",
    "The Batman",
    "Mission: Impossible – The Final Reckoning",
    "Venom 3",
    "Transformers: One",
    "The Zone of Interest",
    "Kingdom of the Planet of the Apes",
    "Furiosa",
    "Blade Runner 2049",
    "Avatar: The Way of Water",
];

/// Import a plain-text cinema listing.
///
/// Entries are separated by blank lines. The first line of an entry is the
/// cinema name, the optional second line its address. The listing carries no
/// coordinates, so positions are placed at random within about 2 km of the
/// city centre, and phone, website, hours, prices, facilities and films are
/// synthesised.
pub fn parse_listing<R: Rng + ?Sized>(text: &str, rng: &mut R) -> Vec<Cinema> {
    let mut cinemas = Vec::new();
    let mut entry: Vec<&str> = Vec::new();
    for line in text.lines().map(str::trim).chain(std::iter::once("")) {
        if !line.is_empty() {
            entry.push(line);
            continue;
        }
        if let Some((name, rest)) = entry.split_first() {
            let address = rest.first().copied().unwrap_or_default();
            cinemas.push(synthesise(name, address, rng));
        }
        entry.clear();
    }
    cinemas
}

fn synthesise<R: Rng + ?Sized>(name: &str, address: &str, rng: &mut R) -> Cinema {
    let latitude = BASE_LATITUDE + (rng.gen::<f64>() - 0.5) * JITTER_DEGREES;
    let longitude = BASE_LONGITUDE + (rng.gen::<f64>() - 0.5) * JITTER_DEGREES;

    let phone = format!(
        "+34 {} {} {}",
        rng.gen_range(900..1000),
        rng.gen_range(100..1000),
        rng.gen_range(100..1000)
    );
    let slug: String = name
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect();

    let opening_hours = format!(
        "Mon-Sun: {:02}:00 - {:02}:00",
        rng.gen_range(10..13),
        rng.gen_range(21..25)
    );
    let base_price = rng.gen_range(7..12);
    let ticket_prices = format!("General: {base_price}.90€, Reduced: {}.50€", base_price - 2);

    let mut facilities = vec![format!("{} Screens", rng.gen_range(2..20))];
    let extras = [
        ("Digital Projection", 0.5),
        ("3D", 0.5),
        ("IMAX", 0.3),
        ("Dolby Sound", 0.5),
        ("Concessions", 0.7),
        ("VIP Seating", 0.4),
    ];
    for (facility, chance) in extras {
        if rng.gen_bool(chance) {
            facilities.push(facility.to_string());
        }
    }

    let movie_count = rng.gen_range(3..6);
    let current_movies = index::sample(rng, POPULAR_MOVIES.len(), movie_count)
        .into_iter()
        .map(|i| POPULAR_MOVIES[i].to_string())
        .collect();

    Cinema {
        name: name.to_string(),
        latitude,
        longitude,
        address: address.to_string(),
        phone,
        website: format!("www.{slug}.es"),
        opening_hours,
        ticket_prices,
        facilities: facilities.join(", "),
        current_movies,
    }
}
