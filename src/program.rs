use std::collections::HashMap;

/// A single exercise in the fixed program.
#[derive(Clone, Copy, Debug)]
pub struct Exercise {
    /// The display name, also the key under which weights are logged.
    pub name: &'static str,

    /// The prescribed set range.
    pub sets: &'static str,

    /// The prescribed rep range.
    pub reps: &'static str,
}

/// The program shown by the page. Fixed for the session.
pub const WORKOUT_PROGRAM: [Exercise; 5] = [
    Exercise {
        name: "Barbell Curl",
        sets: "3-4",
        reps: "10-12",
    },
    Exercise {
        name: "Dumbbell Squat",
        sets: "3-4",
        reps: "10-12",
    },
    Exercise {
        name: "Dumbbell Hammer Curls",
        sets: "3-4",
        reps: "10-12",
    },
    Exercise {
        name: "Barbell Row",
        sets: "3-4",
        reps: "10-12",
    },
    Exercise {
        name: "Barbell Rack Pulls",
        sets: "3-4",
        reps: "10-12",
    },
];

/// The weights typed into the form, one entry per program exercise.
///
/// Never persisted itself; a snapshot becomes the `exercises` field of a
/// logged workout.
#[derive(Clone, Debug, PartialEq)]
pub struct WeightDraft {
    weights: HashMap<String, String>,
}

impl WeightDraft {
    /// Creates a draft with an empty entry for every program exercise.
    pub fn new() -> Self {
        let weights = WORKOUT_PROGRAM
            .iter()
            .map(|exercise| (exercise.name.to_owned(), String::new()))
            .collect();

        WeightDraft { weights }
    }

    /// Records the weight typed for the named exercise. Names outside the
    /// program are ignored; the form only renders program entries.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        if let Some(weight) = self.weights.get_mut(name) {
            *weight = value.into();
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.weights.get(name).map(String::as_str)
    }

    /// Returns true if every entry is empty.
    pub fn is_empty(&self) -> bool {
        self.weights.values().all(String::is_empty)
    }

    /// Clears every entry back to the empty string.
    pub fn reset(&mut self) {
        for weight in self.weights.values_mut() {
            weight.clear();
        }
    }

    /// The submission view of the draft.
    pub fn snapshot(&self) -> HashMap<String, String> {
        self.weights.clone()
    }
}

impl Default for WeightDraft {
    fn default() -> Self {
        WeightDraft::new()
    }
}
