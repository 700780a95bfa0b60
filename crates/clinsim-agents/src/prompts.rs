//! Prompt template registry.
//!
//! Templates live in a JSON object keyed by template name; a value may
//! be a single string or an array of strings that are concatenated, so
//! long prompts can be kept readable in the file. Placeholders use
//! `{name}` syntax and are filled by [`PromptTemplates::render`].

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::error::AgentError;

#[derive(Debug, Clone)]
pub struct PromptTemplates {
    templates: HashMap<String, String>,
}

impl PromptTemplates {
    /// Built-in Chinese templates covering every agent operation.
    pub fn defaults() -> Self {
        let mut templates = HashMap::new();
        for (key, text) in DEFAULT_TEMPLATES {
            templates.insert((*key).to_string(), (*text).to_string());
        }
        Self { templates }
    }

    /// Parses a JSON template file, overlaying entries on the defaults.
    pub fn from_json_str(content: &str) -> Result<Self, AgentError> {
        let data: HashMap<String, Value> = serde_json::from_str(content)?;
        let mut prompts = Self::defaults();
        for (key, value) in data {
            let text = match value {
                Value::String(s) => s,
                Value::Array(parts) => parts
                    .iter()
                    .filter_map(|part| part.as_str())
                    .collect::<Vec<_>>()
                    .concat(),
                other => other.to_string(),
            };
            prompts.templates.insert(key, text);
        }
        Ok(prompts)
    }

    pub fn from_file(path: &Path) -> Result<Self, AgentError> {
        let content = fs::read_to_string(path)
            .map_err(|e| AgentError::MissingPrompt(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&content)
    }

    pub fn get(&self, key: &str) -> Result<&str, AgentError> {
        self.templates
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| AgentError::MissingPrompt(key.to_string()))
    }

    /// Fills `{name}` placeholders in the named template.
    pub fn render(&self, key: &str, vars: &[(&str, &str)]) -> Result<String, AgentError> {
        let mut out = self.get(key)?.to_string();
        for (name, value) in vars {
            out = out.replace(&format!("{{{name}}}"), value);
        }
        Ok(out)
    }
}

const DEFAULT_TEMPLATES: &[(&str, &str)] = &[
    (
        "assign_doctor_office",
        "你是一位医院分诊台的护士。根据下面病人的自述，判断应该挂哪个科室的号，\
         将科室名称写在**（两个星号）之间，例如**呼吸内科**。\n病人自述：{information}",
    ),
    (
        "patient_question_generator",
        "你扮演一位没有专业医学知识的病人，角色设定：{profile}\n\
         你对自己病情的了解：{information}\n\
         请用口语向医生描述你的主诉，将主诉写在**之间。",
    ),
    (
        "patient_answer_generator",
        "你是一个能够模仿没有专业医学知识病人口吻进行回答的回答生成器，\n\
         这个病人的角色扮演要求：{profile}\n---------\n\
         现在有一位医生向你提问。\n问题为：{question}。\n\
         病情信息为：{information}。\n例子：{example}\n\
         请只依据病情信息回答，不要编造，不要使用医学术语。",
    ),
    (
        "dynamic_requirements",
        "下面是医生向病人提出的一个问题，请总结病人回答这类问题时需要注意的要求，\
         将要求写在**之间。\n问题：{question}",
    ),
    (
        "question_general_detect",
        "判断下面这个医生的提问是否足够具体、病人可以直接回答。\
         足够具体请回答“是”，过于空泛请回答“否”。\n问题：{question}",
    ),
    (
        "patient_crisis_generator",
        "你扮演一位正在就诊的病人，根据病情信息虚构一个就诊过程中突然出现的紧急情况\
         （例如突发剧烈疼痛、晕厥等），用第一人称描述。\n病情信息：{information}",
    ),
    (
        "patient_crisis_answer",
        "你扮演一位病人，角色设定：{profile}\n病情信息：{information}\n\
         你刚刚出现了紧急情况：{crisis}\n医生的处理答复是：{doctor_answer}\n\
         请用口语描述你对医生答复的反应。",
    ),
    (
        "doctor_question_info",
        "你是{office}的一位医生，正在对病人进行问诊。\n病人主诉：{complaint}\n\
         之前问诊的总结：{summary}\n最近的对话：{history}\n\
         参考例子：{example}\n病历参考信息：{information}\n\
         请提出下一个最有价值的问题，写在**之间；同时给出问题类别（如现病史、既往史、\
         家族史），写在##之间。如果没有要问的，写**NO**；\
         如果信息已足够，写**conclusion**。",
    ),
    (
        "summary",
        "你是{office}的一位医生。请将既有总结与下面新增的对话合并成一段简明的问诊总结，\
         保留症状、持续时间和已排除的情况。\n既有总结：{summary}\n新增对话：\n",
    ),
    (
        "conclusion",
        "你是{office}的一位医生，问诊已经结束。\n问诊总结：{summary}\n\
         最近的对话：{history}\n请给出初步诊断结论与下一步检查建议。",
    ),
    (
        "recruit",
        "你是{office}的一位医生。\n病人主诉：{complaint}\n问诊总结：{summary}\n\
         最近的对话：{history}\n已进行轮数：{turn}\n\
         如果需要请其他科室的医生会诊，将科室名称写在##之间，多个科室用逗号分隔；\
         不需要则写##NO##。",
    ),
    (
        "doctor_crisis_answer",
        "你是{office}的一位医生。问诊过程中病人突然出现紧急情况：{crisis}\n\
         此前的对话：{chat}\n病历参考信息：{information}\n\
         请给出你的紧急处理答复。",
    ),
    (
        "vagueness",
        "请把下面这段残缺的病历信息改写成病人自己含糊、口语化的描述，\
         保留仍然可见的事实，缺失的细节用不确定的说法带过。\n信息：{information}",
    ),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_cover_agent_operations() {
        let prompts = PromptTemplates::defaults();
        for key in [
            "assign_doctor_office",
            "patient_question_generator",
            "patient_answer_generator",
            "dynamic_requirements",
            "question_general_detect",
            "patient_crisis_generator",
            "patient_crisis_answer",
            "doctor_question_info",
            "summary",
            "conclusion",
            "recruit",
            "doctor_crisis_answer",
            "vagueness",
        ] {
            assert!(prompts.get(key).is_ok(), "missing template {key}");
        }
    }

    #[test]
    fn test_render_fills_placeholders() {
        let prompts = PromptTemplates::defaults();
        let rendered = prompts
            .render("dynamic_requirements", &[("question", "咳嗽多久了？")])
            .unwrap();
        assert!(rendered.contains("咳嗽多久了？"));
        assert!(!rendered.contains("{question}"));
    }

    #[test]
    fn test_missing_key_errors() {
        let prompts = PromptTemplates::defaults();
        let err = prompts.get("no_such_template").unwrap_err();
        assert!(err.to_string().contains("no_such_template"));
    }

    #[test]
    fn test_json_string_value_overrides_default() {
        let prompts =
            PromptTemplates::from_json_str(r#"{"summary": "override {summary}"}"#).unwrap();
        assert_eq!(prompts.get("summary").unwrap(), "override {summary}");
        // Untouched defaults remain available.
        assert!(prompts.get("recruit").is_ok());
    }

    #[test]
    fn test_json_array_value_is_concatenated() {
        let prompts =
            PromptTemplates::from_json_str(r#"{"greeting": ["第一段", "第二段"]}"#).unwrap();
        assert_eq!(prompts.get("greeting").unwrap(), "第一段第二段");
    }

    #[test]
    fn test_invalid_json_errors() {
        assert!(PromptTemplates::from_json_str("not json").is_err());
    }
}
