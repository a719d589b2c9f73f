use tracing::warn;

use crate::element::{ElementDescriptor, Source};
use crate::error::Error;
use crate::registry::{ConvertContext, ModuleHandler, Props};
use crate::value::ResolvedModule;

/// `prebuilt_etc` and `prebuilt_etc_host`: a single file installed under
/// `/etc`, emitted as an `import` element.
pub struct PrebuiltEtcHandler;

impl ModuleHandler for PrebuiltEtcHandler {
    fn convert(
        &self,
        module: &ResolvedModule,
        ctx: &ConvertContext<'_>,
    ) -> Result<Vec<ElementDescriptor>, Error> {
        let props = Props::new(module);
        let name = props.name()?;
        if props.bool("enabled")? == Some(false) {
            return Ok(Vec::new());
        }
        let src = match props.string("src")? {
            Some(src) if !src.is_empty() => src,
            _ => {
                warn!(module = name, "prebuilt_etc without 'src', nothing to import");
                return Ok(Vec::new());
            }
        };

        let mut element = ElementDescriptor::new(name, "import");
        if let Some(dir) = &ctx.options.source_dir {
            element.sources.push(Source {
                kind: "local_external".to_string(),
                path: dir.clone(),
            });
        }
        element.config.insert("source".to_string(), src.to_string());
        element.config.insert("target".to_string(), "/etc".to_string());
        Ok(vec![element])
    }
}
