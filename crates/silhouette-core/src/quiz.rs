//! Quiz-based fallback scoring.
//!
//! Used when the camera path is unavailable or keeps rejecting. Each option
//! awards points to zero or more categories; the category with the strictly
//! highest total wins, and ties go to whichever comes first in the
//! category's declared order.

use std::fmt::Debug;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::body_shape::BodyShape;
use crate::skin_tone::SkinTone;
use crate::types::ClassificationResult;

/// Quiz results are treated as authoritative.
pub const QUIZ_CONFIDENCE: f32 = 1.0;

/// A category a quiz can score, with a fixed tie-break order.
pub trait Category: Copy + PartialEq + Debug + 'static {
    const ORDER: &'static [Self];
}

impl Category for BodyShape {
    const ORDER: &'static [Self] = &BodyShape::ALL;
}

impl Category for SkinTone {
    const ORDER: &'static [Self] = &SkinTone::ALL;
}

#[derive(Debug)]
pub struct QuizOption<C: 'static> {
    pub id: &'static str,
    pub label: &'static str,
    pub points: &'static [(C, u32)],
}

#[derive(Debug)]
pub struct Question<C: 'static> {
    pub id: &'static str,
    pub prompt: &'static str,
    pub options: &'static [QuizOption<C>],
}

impl<C: 'static> Question<C> {
    pub fn option(&self, id: &str) -> Option<&'static QuizOption<C>> {
        self.options.iter().find(|o| o.id.eq_ignore_ascii_case(id))
    }
}

/// A single selected option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizAnswer {
    pub question_id: String,
    pub option_id: String,
}

impl QuizAnswer {
    pub fn new(question_id: impl Into<String>, option_id: impl Into<String>) -> Self {
        Self {
            question_id: question_id.into(),
            option_id: option_id.into(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QuizError {
    #[error("unknown question: {0}")]
    UnknownQuestion(String),
    #[error("question {question} has no option {option}")]
    UnknownOption { question: String, option: String },
}

/// Accumulated points per category, in tie-break order.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreTable<C> {
    scores: Vec<(C, u32)>,
}

impl<C: Category> Default for ScoreTable<C> {
    fn default() -> Self {
        Self {
            scores: C::ORDER.iter().map(|&c| (c, 0)).collect(),
        }
    }
}

impl<C: Category> ScoreTable<C> {
    pub fn add(&mut self, points: &[(C, u32)]) {
        for &(category, pts) in points {
            if let Some(entry) = self.scores.iter_mut().find(|(c, _)| *c == category) {
                entry.1 += pts;
            }
        }
    }

    pub fn get(&self, category: C) -> u32 {
        self.scores
            .iter()
            .find(|(c, _)| *c == category)
            .map_or(0, |(_, s)| *s)
    }

    pub fn entries(&self) -> &[(C, u32)] {
        &self.scores
    }

    /// Category with the strictly highest score; the first one wins ties.
    pub fn winner(&self) -> Option<C> {
        let mut best: Option<(C, u32)> = None;
        for &(c, s) in &self.scores {
            if best.map_or(true, |(_, b)| s > b) {
                best = Some((c, s));
            }
        }
        best.map(|(c, _)| c)
    }
}

/// Sum the points of every answer and pick the winner.
pub fn score<C: Category>(
    questions: &[Question<C>],
    answers: &[QuizAnswer],
) -> Result<(ScoreTable<C>, Option<ClassificationResult<C>>), QuizError> {
    let mut table = ScoreTable::default();
    for answer in answers {
        let option = resolve(questions, answer)?;
        table.add(option.points);
    }
    let result = if answers.is_empty() {
        None
    } else {
        table
            .winner()
            .map(|c| ClassificationResult::new(c, QUIZ_CONFIDENCE))
    };
    Ok((table, result))
}

fn resolve<C: 'static>(
    questions: &[Question<C>],
    answer: &QuizAnswer,
) -> Result<&'static QuizOption<C>, QuizError> {
    let question = questions
        .iter()
        .find(|q| q.id == answer.question_id)
        .ok_or_else(|| QuizError::UnknownQuestion(answer.question_id.clone()))?;
    question
        .option(&answer.option_id)
        .ok_or_else(|| QuizError::UnknownOption {
            question: answer.question_id.clone(),
            option: answer.option_id.clone(),
        })
}

/// One quiz attempt. Owns its answers; nothing is shared between sessions.
pub struct QuizSession<C: 'static> {
    questions: &'static [Question<C>],
    answers: Vec<QuizAnswer>,
}

impl<C: Category> QuizSession<C> {
    pub fn new(questions: &'static [Question<C>]) -> Self {
        Self {
            questions,
            answers: Vec::new(),
        }
    }

    pub fn questions(&self) -> &'static [Question<C>] {
        self.questions
    }

    /// Record an answer. Answering a question again replaces the earlier choice.
    pub fn answer(&mut self, question_id: &str, option_id: &str) -> Result<(), QuizError> {
        let answer = QuizAnswer::new(question_id, option_id);
        resolve(self.questions, &answer)?;
        match self
            .answers
            .iter_mut()
            .find(|a| a.question_id == question_id)
        {
            Some(existing) => *existing = answer,
            None => self.answers.push(answer),
        }
        Ok(())
    }

    pub fn answers(&self) -> &[QuizAnswer] {
        &self.answers
    }

    pub fn is_complete(&self) -> bool {
        self.answers.len() == self.questions.len()
    }

    pub fn scores(&self) -> ScoreTable<C> {
        // Answers were validated on entry.
        score(self.questions, &self.answers)
            .map(|(table, _)| table)
            .unwrap_or_default()
    }

    /// Winning category, or `None` before any question is answered.
    pub fn result(&self) -> Option<ClassificationResult<C>> {
        score(self.questions, &self.answers)
            .ok()
            .and_then(|(_, result)| result)
    }

    pub fn reset(&mut self) {
        self.answers.clear();
    }
}

use BodyShape::{Apple, Hourglass, InvertedTriangle, Pear, Rectangle};

pub static BODY_SHAPE_QUIZ: [Question<BodyShape>; 3] = [
    Question {
        id: "q1",
        prompt: "Which part of your body is widest?",
        options: &[
            QuizOption { id: "A", label: "Hips and thighs", points: &[(Pear, 2)] },
            QuizOption { id: "B", label: "Shoulders or bust", points: &[(InvertedTriangle, 2)] },
            QuizOption {
                id: "C",
                label: "Bust and hips are about equal, waist clearly smaller",
                points: &[(Hourglass, 2)],
            },
            QuizOption { id: "D", label: "Midsection", points: &[(Apple, 2)] },
            QuizOption { id: "E", label: "Everything is about the same width", points: &[(Rectangle, 2)] },
        ],
    },
    Question {
        id: "q2",
        prompt: "How would you describe your waist?",
        options: &[
            QuizOption {
                id: "A",
                label: "Defined, but my hips are noticeably wider",
                points: &[(Pear, 2), (Hourglass, 1)],
            },
            QuizOption {
                id: "B",
                label: "Clearly defined, with bust and hips balanced",
                points: &[(Hourglass, 2)],
            },
            QuizOption { id: "C", label: "Little definition, fairly straight", points: &[(Rectangle, 2)] },
            QuizOption { id: "D", label: "Fuller than my bust and hips", points: &[(Apple, 2)] },
            QuizOption {
                id: "E",
                label: "Narrow compared with broad shoulders",
                points: &[(InvertedTriangle, 2)],
            },
        ],
    },
    Question {
        id: "q3",
        prompt: "Where do you tend to gain weight first?",
        options: &[
            QuizOption { id: "A", label: "Hips and thighs", points: &[(Pear, 2)] },
            QuizOption { id: "B", label: "Stomach and midsection", points: &[(Apple, 2)] },
            QuizOption { id: "C", label: "Evenly all over", points: &[(Hourglass, 1), (Rectangle, 1)] },
            QuizOption { id: "D", label: "Shoulders, arms and upper back", points: &[(InvertedTriangle, 2)] },
        ],
    },
];

use SkinTone::{
    DeepCool, DeepWarm, FairCool, FairWarm, LightCool, LightNeutral, LightWarm, MediumCool,
    MediumNeutral, MediumWarm,
};

pub static SKIN_TONE_QUIZ: [Question<SkinTone>; 3] = [
    Question {
        id: "q1",
        prompt: "What colour are the veins on your inner wrist?",
        options: &[
            QuizOption {
                id: "A",
                label: "Blue or purple",
                points: &[(FairCool, 1), (LightCool, 1), (MediumCool, 1), (DeepCool, 1)],
            },
            QuizOption {
                id: "B",
                label: "Green or olive",
                points: &[(FairWarm, 1), (LightWarm, 1), (MediumWarm, 1), (DeepWarm, 1)],
            },
            QuizOption {
                id: "C",
                label: "A mix of both",
                points: &[(LightNeutral, 2), (MediumNeutral, 2)],
            },
        ],
    },
    Question {
        id: "q2",
        prompt: "How does your skin react to the sun?",
        options: &[
            QuizOption { id: "A", label: "Always burns, rarely tans", points: &[(FairCool, 2), (FairWarm, 2)] },
            QuizOption {
                id: "B",
                label: "Burns first, then tans",
                points: &[(LightCool, 2), (LightNeutral, 2), (LightWarm, 2)],
            },
            QuizOption {
                id: "C",
                label: "Tans easily",
                points: &[(MediumCool, 2), (MediumNeutral, 2), (MediumWarm, 2)],
            },
            QuizOption { id: "D", label: "Rarely burns, deepens quickly", points: &[(DeepCool, 2), (DeepWarm, 2)] },
        ],
    },
    Question {
        id: "q3",
        prompt: "Which jewellery flatters you most?",
        options: &[
            QuizOption {
                id: "A",
                label: "Silver",
                points: &[(FairCool, 1), (LightCool, 1), (MediumCool, 1), (DeepCool, 1)],
            },
            QuizOption {
                id: "B",
                label: "Gold",
                points: &[(FairWarm, 1), (LightWarm, 1), (MediumWarm, 1), (DeepWarm, 1)],
            },
            QuizOption {
                id: "C",
                label: "Both look good",
                points: &[(LightNeutral, 1), (MediumNeutral, 1)],
            },
        ],
    },
];
