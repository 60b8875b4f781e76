//! Fixed prompt text

/// Chain-of-thought instructions placed at the top of every prompt
pub const SYSTEM_INSTRUCTIONS: &str = r#"You are a highly-capable coding assistant.
When you answer:
  - First, think step by step and outline your reasoning
  - Then, provide a concise final answer under "Final Answer:"
  - Always reference file names and paths when relevant
  - If you don't know, say "I don't know.""#;

/// Worked examples showing the expected answer shape
pub const FEW_SHOT_EXAMPLES: &str = r#"Example 1:
Context:
  File structure:
    - main.py: loads data and runs training loop
    - utils.py: data normalization functions
Question:
  How does the data normalization work?
Answer:
  1. Locate `normalize()` in `utils.py`.
  2. It subtracts the mean and divides by standard deviation.
  3. Called in `main.py` before each training batch.
  **Final Answer**: Data normalization is implemented in `utils.py`'s `normalize()` which standardizes inputs (mean zero, unit variance) and is invoked in `main.py`.

Example 2:
Context:
  File structure:
    - api.py: defines FastAPI routes
    - models.py: Pydantic schemas `User`, `Item`
Question:
  Which endpoint returns all items for a user?
Answer:
  1. In `api.py`, inspect `/users/{user_id}/items`.
  2. This route calls `get_items_by_user` in `models.py`.
  3. It returns a list of `Item` schemas.
  **Final Answer**: The endpoint `GET /users/{user_id}/items` in `api.py` returns all items for that user."#;

pub const CONTEXT_HEADER: &str = "### Repository Context";
pub const CONVERSATION_HEADER: &str = "### Conversation";
pub const QUESTION_HEADER: &str = "### User Question";
pub const ANSWER_HEADER: &str = "### Your Answer";

/// Placed between context chunks
pub const CHUNK_SEPARATOR: &str = "\n\n---\n\n";

/// Context body when no chunk survives
pub const NO_CONTEXT: &str = "(no repository context available)";
