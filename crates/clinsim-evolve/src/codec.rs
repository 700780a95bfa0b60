//! Row codec for persisted experience records.
//!
//! Persistence mechanics live outside the core; this codec only fixes the
//! artifact shape downstream writers must honor: ordered fields with the
//! key embedding as comma-joined floats.

use clinsim_protocols::Embedding;

use crate::error::StoreError;
use crate::record::{DoctorExchange, ExperienceRecord};

fn encode_embedding(embedding: &Embedding) -> String {
    embedding
        .vector
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

fn decode_embedding(field: &str) -> Result<Embedding, StoreError> {
    let vector = field
        .split(',')
        .map(|item| {
            item.trim()
                .parse::<f32>()
                .map_err(|e| StoreError::Codec(format!("bad embedding component: {e}")))
        })
        .collect::<Result<Vec<f32>, StoreError>>()?;
    Ok(Embedding::new(vector))
}

/// Patient row: `[key_embedding, question, context, answer, requirements]`.
pub fn encode_patient_row(record: &ExperienceRecord) -> Vec<String> {
    vec![
        encode_embedding(&record.key_embedding),
        record.question.clone(),
        record.context.clone(),
        record.answer.clone(),
        record.requirements.clone(),
    ]
}

pub fn decode_patient_row(row: &[String]) -> Result<ExperienceRecord, StoreError> {
    if row.len() != 5 {
        return Err(StoreError::Codec(format!(
            "expected 5 fields, got {}",
            row.len()
        )));
    }
    Ok(ExperienceRecord {
        key_embedding: decode_embedding(&row[0])?,
        question: row[1].clone(),
        context: row[2].clone(),
        answer: row[3].clone(),
        requirements: row[4].clone(),
    })
}

/// Doctor row: `[question1, key1, context1, answer1, key2, question2,
/// answer2, context2]`.
pub fn encode_doctor_row(record: &DoctorExchange) -> Vec<String> {
    vec![
        record.question1.clone(),
        encode_embedding(&record.key1),
        record.context1.clone(),
        record.answer1.clone(),
        encode_embedding(&record.key2),
        record.question2.clone(),
        record.answer2.clone(),
        record.context2.clone(),
    ]
}

pub fn decode_doctor_row(row: &[String]) -> Result<DoctorExchange, StoreError> {
    if row.len() != 8 {
        return Err(StoreError::Codec(format!(
            "expected 8 fields, got {}",
            row.len()
        )));
    }
    Ok(DoctorExchange {
        question1: row[0].clone(),
        key1: decode_embedding(&row[1])?,
        context1: row[2].clone(),
        answer1: row[3].clone(),
        key2: decode_embedding(&row[4])?,
        question2: row[5].clone(),
        answer2: row[6].clone(),
        context2: row[7].clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patient_row_round_trip() {
        let record = ExperienceRecord {
            key_embedding: Embedding::new(vec![0.25, -1.5, 3.0]),
            question: "最近咳嗽吗".to_string(),
            context: "发热咳嗽三天".to_string(),
            answer: "咳嗽得厉害".to_string(),
            requirements: "口语化".to_string(),
        };

        let row = encode_patient_row(&record);
        assert_eq!(row.len(), 5);
        assert_eq!(row[0], "0.25,-1.5,3");

        let back = decode_patient_row(&row).unwrap();
        assert_eq!(back.key_embedding.vector, record.key_embedding.vector);
        assert_eq!(back.question, record.question);
        assert_eq!(back.requirements, record.requirements);
    }

    #[test]
    fn test_doctor_row_round_trip() {
        let record = DoctorExchange {
            question1: "q1".to_string(),
            key1: Embedding::new(vec![1.0, 2.0]),
            context1: "c1".to_string(),
            answer1: "a1".to_string(),
            key2: Embedding::new(vec![3.0, 4.0]),
            question2: "q2".to_string(),
            answer2: "a2".to_string(),
            context2: "c2".to_string(),
        };

        let row = encode_doctor_row(&record);
        assert_eq!(row.len(), 8);

        let back = decode_doctor_row(&row).unwrap();
        assert_eq!(back.key1.vector, vec![1.0, 2.0]);
        assert_eq!(back.key2.vector, vec![3.0, 4.0]);
        assert_eq!(back.question2, "q2");
    }

    #[test]
    fn test_decode_rejects_wrong_arity() {
        let row = vec!["only".to_string(), "three".to_string(), "fields".to_string()];
        assert!(decode_patient_row(&row).is_err());
        assert!(decode_doctor_row(&row).is_err());
    }

    #[test]
    fn test_decode_rejects_bad_floats() {
        let mut row = vec![String::new(); 5];
        row[0] = "0.1,not-a-number".to_string();
        let err = decode_patient_row(&row).unwrap_err();
        assert!(err.to_string().contains("bad embedding component"));
    }

    #[test]
    fn test_decode_tolerates_spaces_after_commas() {
        let mut row = vec![String::new(); 5];
        row[0] = "0.1, 0.2, 0.3".to_string();
        let record = decode_patient_row(&row).unwrap();
        assert_eq!(record.key_embedding.dimension, 3);
    }
}
