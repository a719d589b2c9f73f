//! C and C++ library and binary modules, converted to `aosp_cc` elements.

use std::collections::BTreeSet;

use crate::element::{ElementDescriptor, Source};
use crate::error::Error;
use crate::registry::{ConvertContext, ModuleHandler, Props};
use crate::value::ResolvedModule;

pub const CC_ELEMENT_KIND: &str = "aosp_cc";

/// Module properties naming other modules to depend on, in emission order.
const DEPENDENCY_PROPERTIES: [&str; 4] = [
    "static_libs",
    "whole_static_libs",
    "shared_libs",
    "header_libs",
];

const INCLUDE_PROPERTIES: [&str; 3] = ["local_include_dirs", "include_dirs", "export_include_dirs"];

const CXX_EXTENSIONS: [&str; 5] = [".cc", ".cpp", ".cxx", ".c++", ".C"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildType {
    Static,
    Shared,
    Binary,
}

impl BuildType {
    pub fn as_str(self) -> &'static str {
        match self {
            BuildType::Static => "static",
            BuildType::Shared => "shared",
            BuildType::Binary => "binary",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lang {
    C,
    Cxx,
}

impl Lang {
    /// C++ as soon as one source has a C++ extension.
    pub fn detect(srcs: &[&str]) -> Lang {
        let is_cxx = |src: &&str| CXX_EXTENSIONS.iter().any(|ext| src.ends_with(ext));
        if srcs.iter().any(is_cxx) {
            Lang::Cxx
        } else {
            Lang::C
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Lang::C => "c",
            Lang::Cxx => "c++",
        }
    }

    /// Property holding the flags for this language only.
    fn flags_property(self) -> &'static str {
        match self {
            Lang::C => "conlyflags",
            Lang::Cxx => "cppflags",
        }
    }
}

/// Handler emitting one element per build type. `cc_library` passes both
/// `Static` and `Shared`.
pub struct CcHandler {
    variants: Vec<BuildType>,
}

impl CcHandler {
    pub fn new(variants: &[BuildType]) -> Self {
        CcHandler {
            variants: variants.to_vec(),
        }
    }

    fn element_name(&self, name: &str, build_type: BuildType) -> String {
        if build_type == BuildType::Static && self.variants.len() > 1 {
            format!("{}-static", name)
        } else {
            name.to_string()
        }
    }
}

impl ModuleHandler for CcHandler {
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

        let srcs = props.string_list("srcs")?;
        let lang = Lang::detect(&srcs);

        let mut cflags = props.string_list("cflags")?;
        cflags.extend(props.string_list(lang.flags_property())?);
        let ldflags = props.string_list("ldflags")?;

        let mut include_dirs = BTreeSet::new();
        for key in INCLUDE_PROPERTIES {
            include_dirs.extend(props.string_list(key)?);
        }
        let include_flags = include_dirs
            .iter()
            .map(|dir| format!("-I{}", dir))
            .collect::<Vec<_>>()
            .join(" ");

        let mut dependencies: Vec<String> = Vec::new();
        let mut push_dependency = |path: String| {
            if !dependencies.contains(&path) {
                dependencies.push(path);
            }
        };
        for base in &ctx.options.base_depends {
            push_dependency(base.clone());
        }
        for key in DEPENDENCY_PROPERTIES {
            for lib in props.string_list(key)? {
                push_dependency(ctx.options.dependency_path(lib));
            }
        }

        let elements = self
            .variants
            .iter()
            .map(|&build_type| {
                let mut element =
                    ElementDescriptor::new(self.element_name(name, build_type), CC_ELEMENT_KIND);
                element.dependencies = dependencies.clone();
                if let Some(dir) = &ctx.options.source_dir {
                    element.sources.push(Source {
                        kind: "local_external".to_string(),
                        path: dir.clone(),
                    });
                }
                element
                    .variables
                    .insert("build-type".to_string(), build_type.as_str().to_string());
                element
                    .variables
                    .insert("lang".to_string(), lang.as_str().to_string());
                element
                    .variables
                    .insert("src-files".to_string(), srcs.join(" "));
                let name_key = match build_type {
                    BuildType::Binary => "binary-name",
                    BuildType::Static | BuildType::Shared => "lib-name",
                };
                element.variables.insert(name_key.to_string(), name.to_string());
                element.set_nonempty("extra-cflags", cflags.join(" "));
                element.set_nonempty("extra-ldflags", ldflags.join(" "));
                element.set_nonempty("include-flags", include_flags.clone());
                element
            })
            .collect();
        Ok(elements)
    }
}
