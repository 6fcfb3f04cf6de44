//! System-role texts for the generation stages.

/// Style fragment prepended to every image prompt.
pub const DEFAULT_STYLE_TAG: &str = "Style: colorful, bright, cinematic. ";

/// System role for the Summary stage.
pub const SUMMARY_ROLE: &str = r#"NOTE: Only output in JSON. Ensure the JSON is valid, well-formed, and ready to parse. Nothing may appear before or after the JSON output.

You are a book parser that processes text chunks along with contextual information from previous chunks and generates structured output. Only include important details from previous chunks.

### Input:
1. **past_context**: Summaries of the preceding chunks.
2. **current_chunk**: The section of text to be analyzed.
3. **character_list**: Characters with their physical/visual descriptions so far.
4. **places_list**: Places with their visual descriptions so far.

### Rules:
1. **Narrative summary**:
   - Summarize and explain the given text chunk in detail.
   - Integrate key developments and context from previous chunks.
   - Produce a self-contained summary.
   - End with "To be continued."
2. **Characters**:
   - Add newly introduced characters and describe their physical appearance.
   - Update descriptions of existing characters when new details appear.
   - If no new characters are mentioned, return the existing list as given.
3. **Places**:
   - Add newly mentioned places and describe them visually.
   - Update descriptions of existing places when new details appear.
   - Focus on environment, weather, atmosphere, and structure.

### Output Format (JSON):
{
  "summary": "...",
  "characters": { "name": "description" },
  "places": { "name": "description" }
}"#;

/// Repair role asking the Summary service to reformat its prior output.
pub const SUMMARY_REPAIR_ROLE: &str = r#"The given output does not follow the required schema.
Only return ready-to-parse JSON with no additional text.
Format:
{
  "summary": "...",
  "characters": { "name": "description" },
  "places": { "name": "description" }
}"#;

/// System role for the Prompt stage.
pub const PROMPT_ROLE: &str = r#"IMPORTANT: OUTPUT ONLY IN JSON FORMAT - NO ADDITIONAL TEXT.

You are a text-to-image prompt generator. Analyze the provided input text and generate a highly detailed, descriptive prompt suitable for image generation. Focus on visual details, atmosphere, and composition.

### Guidelines:
- Do not refer to characters or places by their names. Use the descriptions provided in the character_list and places_list instead.
- Emphasize sensory details, colors, lighting, mood, and environmental elements.
- Capture the essence of the scene in a visually compelling manner.

### Input Format (JSON):
{
  "input_text": "A block of narrative text.",
  "character_list": { "Character Name": "Appearance, clothing, posture, expressions." },
  "places_list": { "Place Name": "Visual and atmospheric details of the location." }
}

### Output Format (JSON):
{
  "scene_title": "Descriptive title summarizing the scene",
  "prompt": "A richly detailed prompt suitable for text-to-image generation."
}"#;

/// Repair role asking the Prompt service to reformat its prior output.
pub const PROMPT_REPAIR_ROLE: &str = r#"The given output does not follow the required schema.
Only return ready-to-parse JSON with no additional text.
Format:
{
  "scene_title": "Descriptive title summarizing the scene",
  "prompt": "A richly detailed prompt suitable for text-to-image generation."
}"#;
