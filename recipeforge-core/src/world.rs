//! Run-wide world aggregates
//!
//! Collects every recipe generated during a run and renders the two
//! aggregate files emitted alongside them: the world packagegroup listing
//! all non-native recipes, and the generation conf recording scheme,
//! timestamp, skip list, components, and buildtools.

use std::collections::BTreeSet;

use crate::recipe::{multiline_variable, Provenance};

/// Accumulates recipe names, components, and native recipes over one run.
#[derive(Debug, Default)]
pub struct WorldIndex {
    recipes: BTreeSet<String>,
    components: BTreeSet<String>,
    native_recipes: BTreeSet<String>,
}

impl WorldIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, recipe_name: &str, component: &str) {
        self.recipes.insert(recipe_name.to_string());
        self.components.insert(component.to_string());
    }

    pub fn record_native(&mut self, entries: impl IntoIterator<Item = String>) {
        self.native_recipes.extend(entries);
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }

    /// The world packagegroup: every generated recipe except natives.
    pub fn render_packagegroup(&self, provenance: &Provenance) -> String {
        let mut ret = String::from("# Generated by recipeforge -- DO NOT EDIT\n#\n");
        ret += &format!("# Copyright {} {}\n", provenance.year, provenance.distributor);
        ret += &format!(
            "# Distributed under the terms of the {} license\n\n",
            provenance.license
        );
        ret += "DESCRIPTION = \"All packages listed in ${ROS_DISTRO}-cache.yaml\"\n";
        ret += "LICENSE = \"MIT\"\n\n";
        ret += "inherit packagegroup\n\n";
        ret += "PACKAGES = \"${PN}\"\n\n";

        let world: BTreeSet<String> = self
            .recipes
            .difference(&self.native_recipes)
            .cloned()
            .collect();
        ret += &multiline_variable("RDEPENDS_${PN}", &world);

        ret += "\n# Allow the above settings to be overridden.\n";
        ret += "include ${ROS_LAYERDIR}/recipes-ros/packagegroups/packagegroup-ros-world-${ROS_DISTRO}.inc\n\n";
        ret += "inherit ros_generated\n";
        ret += "inherit ros_${ROS_DISTRO}\n";
        ret
    }

    /// The generation conf file for this run. The start timestamp is passed
    /// in preformatted so rendering stays pure.
    pub fn render_generation_conf(
        &self,
        provenance: &Provenance,
        skip_keys: &BTreeSet<String>,
        started_utc: &str,
    ) -> String {
        let mut ret = String::from("# Generated by recipeforge -- DO NOT EDIT\n#\n");
        ret += &format!("# Copyright {} {}\n", provenance.year, provenance.distributor);
        ret += &format!(
            "# Distributed under the terms of the {} license\n",
            provenance.license
        );
        ret += "\nROS_GENERATION_SCHEME = \"1\"\n";
        ret += "\n# When generation was started, in UTC:\n";
        ret += &format!("ROS_GENERATION_DATETIME = \"{}\"\n\n", started_utc);
        ret += &multiline_variable("ROS_GENERATION_SKIP_LIST", skip_keys);
        ret += "\n# See the packagegroups/packagegroup-ros-world.bb recipe ";
        ret += "for a list of the generated recipes.\n";
        ret += &multiline_variable(
            "ROS_GENERATED_RECIPES_FOR_COMPONENTS",
            &self.components,
        );
        ret += "\n# Packages found in the <buildtool_depend> and ";
        ret += "<buildtool_export_depend> items, ie, ones for which a -native is built.\n";
        ret += &multiline_variable("ROS_GENERATED_BUILDTOOLS", &self.native_recipes);
        ret
    }
}
