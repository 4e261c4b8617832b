//! Instruction templates sent alongside the image parts.

pub const DESCRIBE_REFERENCE_INSTRUCTION: &str = "Analyze this product mockup scene. \
Write a concise, descriptive prompt covering the environment, the lighting and the visual style. \
The prompt will guide an AI that places a different product into this exact scene.";

pub const SUGGEST_PRODUCT_INSTRUCTION: &str = "Analyze the product in this image. \
Write a complete, detailed prompt for a professional and beautiful product photoshoot. \
Describe the ideal background, scene and lighting effects that would complement this specific product, \
ready to be used directly by an image generation AI. \
For example: 'A minimalist shot of the product on a clean, off-white surface with soft, diffused \
morning light creating gentle shadows.'";

pub fn scene_details(lighting_style: &str, camera_perspective: &str) -> String {
    format!(
        "The lighting should be '{lighting_style}' and the camera perspective should be '{camera_perspective}'."
    )
}

/// Parts arrive as `[reference, product, this text]`.
pub fn edit_with_reference_instruction(
    prompt: &str,
    aspect_ratio: &str,
    lighting_style: &str,
    camera_perspective: &str,
) -> String {
    let details = scene_details(lighting_style, camera_perspective);
    format!(
        "You are an expert product photographer. You have two images: the first is a style reference, \
the second is the product to feature, framed for a final aspect ratio of {aspect_ratio}. \
Recreate the scene from the style reference and place the product from the second image into it. \
{details} The final image MUST match the {aspect_ratio} aspect ratio exactly. \
Fill any empty space or padding by extending the environment of the reference image. \
The user's creative instructions are: \"{prompt}\"."
    )
}

/// Parts arrive as `[product, this text]`.
pub fn edit_instruction(
    prompt: &str,
    aspect_ratio: &str,
    lighting_style: &str,
    camera_perspective: &str,
) -> String {
    let details = scene_details(lighting_style, camera_perspective);
    format!(
        "You are an expert product photographer. The provided image contains a product framed for a \
final aspect ratio of {aspect_ratio}. Create a professional product photograph. {details} \
Replace any empty space or padding with a photorealistic background and environment that follows \
the user's instructions. The final image MUST keep the {aspect_ratio} aspect ratio exactly. \
The user's creative instructions are: \"{prompt}\"."
    )
}

pub fn mood_instruction(mood: &str) -> String {
    format!(
        "You are an expert art director and professional product photographer. Analyze the product in \
this image and write a single, highly detailed and imaginative prompt for a professional photoshoot \
with a strong '{mood}' mood, ready to be used by an image generation AI. Describe the scene, the \
background, the specific lighting, the camera angle, the style and any special effects that evoke \
the mood. Aim for a visually stunning result. For example, for a 'Dark & Moody' mood: 'A macro shot \
of the watch on a dark, wet slate rock, with cinematic lighting catching the texture of the rock and \
the gleam of the metal. The background is a misty, out-of-focus forest. Photorealistic style.'"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edit_templates_carry_scene_parameters() {
        for text in [
            edit_instruction("on marble", "16:9", "Golden Hour", "Top-down"),
            edit_with_reference_instruction("on marble", "16:9", "Golden Hour", "Top-down"),
        ] {
            assert!(text.contains("16:9 aspect ratio exactly"));
            assert!(text.contains(
                "The lighting should be 'Golden Hour' and the camera perspective should be 'Top-down'."
            ));
            assert!(text.contains("\"on marble\""));
        }
    }

    #[test]
    fn reference_template_names_both_images() {
        let text = edit_with_reference_instruction("x", "1:1", "Dramatic", "Eye-level");
        assert!(text.contains("the first is a style reference"));
        assert!(!edit_instruction("x", "1:1", "Dramatic", "Eye-level").contains("style reference"));
    }

    #[test]
    fn mood_template_embeds_mood() {
        assert!(mood_instruction("Vintage").contains("strong 'Vintage' mood"));
    }
}
