use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::ClassifierError;

/// The two readings of "jaguar".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sense {
    Animal,
    Car,
}

impl Sense {
    pub const ALL: [Sense; 2] = [Sense::Animal, Sense::Car];

    /// Class index used by the classifier: 0 for `Animal`, 1 for `Car`.
    pub fn index(self) -> usize {
        match self {
            Sense::Animal => 0,
            Sense::Car => 1,
        }
    }

    pub fn from_index(index: usize) -> Option<Sense> {
        Sense::ALL.get(index).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            Sense::Animal => "Animal",
            Sense::Car => "Car",
        }
    }
}

impl fmt::Display for Sense {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<u8> for Sense {
    type Error = ClassifierError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Sense::from_index(value as usize).ok_or(ClassifierError::InvalidLabel(value as usize))
    }
}

/// Result of classifying one sentence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Prediction {
    pub sense: Sense,
    /// Class probabilities indexed by [`Sense::index`]; they sum to 1.
    pub probabilities: [f64; 2],
}

impl Prediction {
    /// Picks the most probable sense. Ties go to `Animal`.
    pub fn from_probabilities(probabilities: [f64; 2]) -> Self {
        let sense = if probabilities[1] > probabilities[0] {
            Sense::Car
        } else {
            Sense::Animal
        };
        Self { sense, probabilities }
    }

    pub fn confidence(&self) -> f64 {
        self.probabilities[0].max(self.probabilities[1])
    }

    pub fn probability_of(&self, sense: Sense) -> f64 {
        self.probabilities[sense.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_round_trip_and_names() {
        for sense in Sense::ALL {
            assert_eq!(Sense::from_index(sense.index()), Some(sense));
        }
        assert_eq!(Sense::from_index(2), None);
        assert_eq!(Sense::Car.to_string(), "Car");
        assert_eq!(Sense::try_from(0u8).unwrap(), Sense::Animal);
        assert!(Sense::try_from(7u8).is_err());
    }

    #[test]
    fn test_prediction_argmax_and_confidence() {
        let p = Prediction::from_probabilities([0.3, 0.7]);
        assert_eq!(p.sense, Sense::Car);
        assert_eq!(p.confidence(), 0.7);
        assert_eq!(p.probability_of(Sense::Animal), 0.3);

        let tie = Prediction::from_probabilities([0.5, 0.5]);
        assert_eq!(tie.sense, Sense::Animal);
    }
}
