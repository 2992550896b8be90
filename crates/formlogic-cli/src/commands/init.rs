//! The `formlogic init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    if std::path::Path::new("formlogic.toml").exists() {
        println!("formlogic.toml already exists, skipping.");
    } else {
        std::fs::write("formlogic.toml", SAMPLE_CONFIG)?;
        println!("Created formlogic.toml");
    }

    std::fs::create_dir_all("forms")?;
    let example_path = std::path::Path::new("forms/example.json");
    if example_path.exists() {
        println!("forms/example.json already exists, skipping.");
    } else {
        std::fs::write(example_path, EXAMPLE_FORM)?;
        println!("Created forms/example.json");
    }

    let answers_path = std::path::Path::new("forms/example-answers.json");
    if answers_path.exists() {
        println!("forms/example-answers.json already exists, skipping.");
    } else {
        std::fs::write(answers_path, EXAMPLE_ANSWERS)?;
        println!("Created forms/example-answers.json");
    }

    println!("\nNext steps:");
    println!("  1. Run: formlogic validate --definition forms/example.json");
    println!(
        "  2. Run: formlogic evaluate --definition forms/example.json --answers forms/example-answers.json"
    );
    println!("  3. Run: formlogic forms save forms/example.json");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# formlogic configuration

default_title = "Untitled form"
max_payload_bytes = 10485760

[store]
type = "file"
data_dir = "./formlogic-data"
"#;

const EXAMPLE_FORM: &str = r#"{
  "title": "Commute survey",
  "description": "How people get to work",
  "form": [
    {
      "question": "How do you usually commute?",
      "type": "radio",
      "options": ["Car", "Bike", "Transit"],
      "logic": [
        { "option": "Car", "showQuestions": [1] },
        { "option": "Transit", "showQuestions": [2] }
      ]
    },
    {
      "question": "How many minutes do you drive each way?",
      "type": "radio",
      "options": ["Under 15", "15 to 45", "Over 45"],
      "quota": { "condition": "<", "value": 60 }
    },
    {
      "question": "Which lines do you take?",
      "type": "checkbox",
      "options": ["Bus", "Tram", "Metro", "Rail"],
      "quota": { "condition": ">", "value": 0 }
    }
  ]
}
"#;

const EXAMPLE_ANSWERS: &str = r#"{
  "answers": [
    { "questionIndex": 0, "answer": "Transit" },
    { "questionIndex": 2, "answer": ["Bus", "Metro"] }
  ]
}
"#;
