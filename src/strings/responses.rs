//! # Trigger Responses
//!
//! Built-in reply pools for the passive triggers.

pub const NICE: &[&str] = &[
    "Nice!",
    "Nice.",
    "nice",
    "Niceee",
    "Niccceee",
    "Very nice!",
    "Noice!",
    "Noice.",
    "N🧊",
    "👌",
];

/// Default chants for the eagles and dallas triggers, replaced by `eagles_responses.json`
/// when that file exists.
pub const EAGLES: &[&str] = &[
    "Go Birds!",
    "da birds!",
    "E.A.G.L.E.S",
    "E-A-G-L-E-S EAGLES!",
    "Fly Eagles Fly!",
    "Bleed green!",
    "Fuck Dallas!",
    "Go Birds.",
    "Philly Special!",
    "It's a Philly thing.",
    "On the road to victory!",
    "Cowgirls!",
    "Poverty franchise!",
];

pub const SHUT_UP: &str = "No, u!";
