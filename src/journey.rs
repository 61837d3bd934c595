use std::fmt::{self, Display, Formatter};

use chrono::{Duration, NaiveDateTime};

pub use crate::timetable::Vehicle;

pub mod extractor;

/// A place a leg starts or ends: a station, or one of its platforms.
#[derive(Debug, Clone, PartialEq)]
pub struct Stop {
    pub name: String,
    pub platform_name: Option<String>,
    pub longitude: f64,
    pub latitude: f64,
}

impl Stop {
    /// Panics if the coordinates are not plausible degrees.
    pub fn new(
        name: String,
        platform_name: Option<String>,
        longitude: f64,
        latitude: f64,
    ) -> Self {
        assert!((-180.0..=180.0).contains(&longitude), "bad longitude {}", longitude);
        assert!((-90.0..=90.0).contains(&latitude), "bad latitude {}", latitude);
        Stop {
            name,
            platform_name,
            longitude,
            latitude,
        }
    }
}

/// A stop served along a transport leg without alighting.
#[derive(Debug, Clone, PartialEq)]
pub struct IntermediateStop {
    pub stop: Stop,
    pub arr_time: NaiveDateTime,
    pub dep_time: NaiveDateTime,
}

/// One vehicle ride.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportLeg {
    pub dep_stop: Stop,
    pub dep_time: NaiveDateTime,
    pub arr_stop: Stop,
    pub arr_time: NaiveDateTime,
    pub intermediate_stops: Vec<IntermediateStop>,
    pub vehicle: Vehicle,
    pub route: String,
    pub destination: String,
}

/// A walk between two stops.
#[derive(Debug, Clone, PartialEq)]
pub struct FootLeg {
    pub dep_stop: Stop,
    pub dep_time: NaiveDateTime,
    pub arr_stop: Stop,
    pub arr_time: NaiveDateTime,
}

impl FootLeg {
    /// A foot leg within one station is a transfer rather than a walk
    /// between distinct stations.
    pub fn is_transfer(&self) -> bool {
        self.dep_stop.name == self.arr_stop.name
    }
}

/// A leg is either a vehicle ride or a walk; there is no third kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Leg {
    Transport(TransportLeg),
    Foot(FootLeg),
}

impl Leg {
    pub fn dep_stop(&self) -> &Stop {
        match self {
            Leg::Transport(leg) => &leg.dep_stop,
            Leg::Foot(leg) => &leg.dep_stop,
        }
    }

    pub fn arr_stop(&self) -> &Stop {
        match self {
            Leg::Transport(leg) => &leg.arr_stop,
            Leg::Foot(leg) => &leg.arr_stop,
        }
    }

    pub fn dep_time(&self) -> NaiveDateTime {
        match self {
            Leg::Transport(leg) => leg.dep_time,
            Leg::Foot(leg) => leg.dep_time,
        }
    }

    pub fn arr_time(&self) -> NaiveDateTime {
        match self {
            Leg::Transport(leg) => leg.arr_time,
            Leg::Foot(leg) => leg.arr_time,
        }
    }

    pub fn duration(&self) -> Duration {
        self.arr_time() - self.dep_time()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BadJourney {
    Empty,
    /// Two consecutive legs of the same kind at this index.
    ConsecutiveLegsOfSameKind(usize),
    /// The leg at this index starts before the previous one ends.
    LegStartsBeforePreviousArrival(usize),
    /// The leg at this index does not start where the previous one ends.
    LegStartsElsewhere(usize),
    /// The leg at this index arrives before it departs.
    ArrivalBeforeDeparture(usize),
    /// An intermediate stop (leg index, stop index) departs before it
    /// arrives.
    StopoverDepartsBeforeArrival(usize, usize),
}

impl Display for BadJourney {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            BadJourney::Empty => write!(f, "a journey must contain at least one leg"),
            BadJourney::ConsecutiveLegsOfSameKind(index) => {
                write!(f, "legs {} and {} are of the same kind", index - 1, index)
            }
            BadJourney::LegStartsBeforePreviousArrival(index) => {
                write!(f, "leg {} starts before leg {} ends", index, index - 1)
            }
            BadJourney::LegStartsElsewhere(index) => {
                write!(f, "leg {} does not start where leg {} ends", index, index - 1)
            }
            BadJourney::ArrivalBeforeDeparture(index) => {
                write!(f, "leg {} arrives before it departs", index)
            }
            BadJourney::StopoverDepartsBeforeArrival(leg, stop) => write!(
                f,
                "intermediate stop {} of leg {} departs before it arrives",
                stop, leg
            ),
        }
    }
}

impl std::error::Error for BadJourney {}

/// An ordered, non-empty sequence of legs alternating between vehicle
/// rides and walks, continuous in both time and place.
#[derive(Debug, Clone, PartialEq)]
pub struct Journey {
    legs: Vec<Leg>,
}

impl Journey {
    pub fn new(legs: Vec<Leg>) -> Result<Self, BadJourney> {
        let journey = Journey { legs };
        journey.check()?;
        Ok(journey)
    }

    fn check(&self) -> Result<(), BadJourney> {
        if self.legs.is_empty() {
            return Err(BadJourney::Empty);
        }

        for (index, leg) in self.legs.iter().enumerate() {
            if leg.arr_time() < leg.dep_time() {
                return Err(BadJourney::ArrivalBeforeDeparture(index));
            }
            if let Leg::Transport(transport) = leg {
                for (stop_index, stopover) in transport.intermediate_stops.iter().enumerate() {
                    if stopover.dep_time < stopover.arr_time {
                        return Err(BadJourney::StopoverDepartsBeforeArrival(index, stop_index));
                    }
                }
            }
        }

        for index in 1..self.legs.len() {
            let previous = &self.legs[index - 1];
            let current = &self.legs[index];

            let same_kind = matches!(
                (previous, current),
                (Leg::Transport(_), Leg::Transport(_)) | (Leg::Foot(_), Leg::Foot(_))
            );
            if same_kind {
                return Err(BadJourney::ConsecutiveLegsOfSameKind(index));
            }
            if current.dep_time() < previous.arr_time() {
                return Err(BadJourney::LegStartsBeforePreviousArrival(index));
            }
            if current.dep_stop() != previous.arr_stop() {
                return Err(BadJourney::LegStartsElsewhere(index));
            }
        }

        Ok(())
    }

    pub fn legs(&self) -> &[Leg] {
        &self.legs
    }

    pub fn dep_stop(&self) -> &Stop {
        // unwrap is safe, emptiness is rejected at construction
        self.legs.first().unwrap().dep_stop()
    }

    pub fn arr_stop(&self) -> &Stop {
        self.legs.last().unwrap().arr_stop()
    }

    pub fn dep_time(&self) -> NaiveDateTime {
        self.legs.first().unwrap().dep_time()
    }

    pub fn arr_time(&self) -> NaiveDateTime {
        self.legs.last().unwrap().arr_time()
    }

    pub fn duration(&self) -> Duration {
        self.arr_time() - self.dep_time()
    }

    /// Number of changes: one less than the number of transport legs.
    pub fn changes(&self) -> usize {
        let transport_legs = self
            .legs
            .iter()
            .filter(|leg| matches!(leg, Leg::Transport(_)))
            .count();
        transport_legs.saturating_sub(1)
    }
}
